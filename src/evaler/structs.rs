use std::{path::PathBuf, sync::{Arc, atomic::AtomicBool}, time::Duration};
use chrono::{DateTime, Local};
use serde_json::Value;
use crate::error::Result;

/// Executes a query on one remote instance and returns the raw, dynamically typed reply.
///
/// An `Err` means the call failed as a whole (transport, authentication). Anything odd about
/// a reply that did arrive is left to the decoder.
pub trait Evaler: Send + Sync {
    fn eval(&self, query: &str, args: &[Value]) -> anyhow::Result<Vec<Value>>;
}

/// A named instance to evaluate on, usually `application:instance`.
#[derive(Clone)]
pub struct EvalTarget {
    pub name: String,
    pub evaler: Arc<dyn Evaler>,
}

#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Upper bound on the number of calls in flight.
    pub parallel: usize,
    /// Per-call timeout, measured from the moment the call starts.
    pub timeout: Duration,
    /// Raised by the caller to abandon the outstanding calls.
    pub cancel: Arc<AtomicBool>,
}

/// The outcome of the evaluation on one target.
#[derive(Debug)]
pub struct TargetResult {
    pub target: String,
    pub timestamp: DateTime<Local>,
    pub result: Result<Vec<Value>>,
}

/// Returns a reply captured earlier, stored as a JSON array in a file, for every query.
#[derive(Debug, Clone)]
pub struct ReplayEvaler {
    pub path: PathBuf,
}
