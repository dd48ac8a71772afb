//! The error taxonomy for replicaset resolution.
//!
//! Shape and field errors always carry the offending raw value, next to a rendering of it that
//! is stable enough to grep for.
use std::time::Duration;
use chrono::{DateTime, Local};
use itertools::Itertools;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplicasetError {
    /// Transport or authentication failure reported by an evaler.
    #[error("{0:#}")]
    Boundary(anyhow::Error),
    /// The reply is not exactly one wrapped mapping.
    #[error("unexpected response: {rendered}")]
    ResponseShape {
        rendered: String,
        raw: Vec<Value>,
    },
    /// A field of the reply is missing or has the wrong type.
    #[error("failed to parse a response: field \"{field}\": expected {expected}, got {rendered}")]
    FieldType {
        field: String,
        expected: &'static str,
        rendered: String,
        raw: Value,
    },
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("resolution cancelled")]
    Cancelled,
    /// Every member of an application failed.
    #[error("failed to get replicasets from all {} instances: {}", .0.len(), render_failures(.0))]
    Aggregate(Vec<InstanceFailure>),
    #[error("orchestrator {0} is not supported")]
    Unsupported(String),
}

/// The failure of a single instance during an application-scoped resolution.
#[derive(Debug)]
pub struct InstanceFailure {
    pub instance: String,
    pub timestamp: DateTime<Local>,
    pub error: ReplicasetError,
}

pub type Result<T> = std::result::Result<T, ReplicasetError>;

impl ReplicasetError {
    pub fn response_shape(raw: Vec<Value>) -> Self {
        ReplicasetError::ResponseShape {
            rendered: render_values(&raw),
            raw,
        }
    }
    pub fn field_type(
        field: impl Into<String>,
        expected: &'static str,
        raw: &Value,
    ) -> Self {
        ReplicasetError::FieldType {
            field: field.into(),
            expected,
            rendered: render_value(raw),
            raw: raw.clone(),
        }
    }
}

/// Renders a raw value the way the replies are quoted in error messages:
/// strings bare, null as `<nil>`, sequences as `[a b]` and mappings as `map[k:v]`.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "<nil>".to_string(),
        Value::Bool(boolean) => boolean.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(string) => string.clone(),
        Value::Array(values) => render_values(values),
        // serde_json keeps object keys sorted, so the rendering is deterministic.
        Value::Object(map) => format!("map[{}]", map.iter().map(|(key, value)| format!("{}:{}", key, render_value(value))).join(" ")),
    }
}

pub fn render_values(values: &[Value]) -> String {
    format!("[{}]", values.iter().map(render_value).join(" "))
}

fn render_failures(failures: &[InstanceFailure]) -> String {
    failures.iter()
        .map(|failure| format!("{}: {}", failure.instance, failure.error))
        .join("; ")
}
