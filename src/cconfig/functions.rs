//! The impls and functions.
//!
use std::{sync::Arc, time::Instant};
use serde_json::{Map, Value};
use log::*;
use crate::error::{InstanceFailure, ReplicasetError, Result};
use crate::evaler::{eval_targets, EvalOptions, EvalTarget, Evaler};
use crate::replicaset::{Failover, Instance, Master, Mode, Orchestrator, Replicaset, Replicasets, ReplicasetsGetter, ReplicasetsMerger, State};
use crate::cconfig::{ApplicationReport, CConfigApplication, CConfigInfo, CConfigInstance, CConfigInstanceInfo, CConfigReply};

/// The topology introspection query, run on every instance.
pub const GET_REPLICASETS_QUERY: &str = include_str!("lua/get_replicasets.lua");

/// Decodes a raw reply to [GET_REPLICASETS_QUERY].
///
/// The reply must be exactly one mapping. Every field is type checked before use: optional
/// fields fall back to their zero value when absent or nil, `uuid` is required and must be a
/// non-empty string.
pub fn decode_reply(data: Vec<Value>) -> Result<CConfigReply> {
    if let [Value::Object(map)] = data.as_slice() {
        return decode_map(map);
    }
    Err(ReplicasetError::response_shape(data))
}

fn decode_map(map: &Map<String, Value>) -> Result<CConfigReply> {
    match map.get("bootstrapped") {
        None | Some(Value::Null) | Some(Value::Bool(true)) => {},
        Some(Value::Bool(false)) => return Ok(CConfigReply::NotBootstrapped),
        Some(other) => return Err(ReplicasetError::field_type("bootstrapped", "a boolean", other)),
    }

    let instances = decode_instances(map.get("instances"))?;
    let leader_uuid = optional_string(map, "leaderuuid")?;
    let alias = optional_string(map, "alias")?;
    let failover = optional_string(map, "failover")?;
    let instance_uuid = optional_string(map, "instanceuuid")?;
    let instance_rw = optional_bool(map, "instancerw")?;
    let uuid = match map.get("uuid") {
        Some(Value::String(uuid)) if !uuid.is_empty() => uuid.clone(),
        Some(other) => return Err(ReplicasetError::field_type("uuid", "a non-empty string", other)),
        None => return Err(ReplicasetError::field_type("uuid", "a non-empty string", &Value::Null)),
    };

    Ok(CConfigReply::Bootstrapped(CConfigInfo {
        uuid,
        leader_uuid,
        alias,
        failover,
        instance_uuid,
        instance_rw,
        instances,
    }))
}

fn decode_instances(value: Option<&Value>) -> Result<Vec<CConfigInstanceInfo>> {
    let values = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(values)) => values,
        Some(other) => return Err(ReplicasetError::field_type("instances", "a sequence", other)),
    };
    values.iter()
        .enumerate()
        .map(|(index, value)| {
            let field = format!("instances[{}]", index);
            match value {
                Value::Object(map) => Ok(CConfigInstanceInfo {
                    alias: string_field(map, "alias", &field)?,
                    uuid: string_field(map, "uuid", &field)?,
                    uri: string_field(map, "uri", &field)?,
                }),
                other => Err(ReplicasetError::field_type(field, "a mapping", other)),
            }
        })
        .collect()
}

// A string field of an instance entry; the error names the full path of the field.
fn string_field(
    map: &Map<String, Value>,
    key: &str,
    parent: &str,
) -> Result<String>
{
    match map.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(string)) => Ok(string.clone()),
        Some(other) => Err(ReplicasetError::field_type(format!("{}.{}", parent, key), "a string", other)),
    }
}

fn optional_string(
    map: &Map<String, Value>,
    key: &str,
) -> Result<String>
{
    match map.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(string)) => Ok(string.clone()),
        Some(other) => Err(ReplicasetError::field_type(key, "a string", other)),
    }
}

fn optional_bool(
    map: &Map<String, Value>,
    key: &str,
) -> Result<bool>
{
    match map.get(key) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(boolean)) => Ok(*boolean),
        Some(other) => Err(ReplicasetError::field_type(key, "a boolean", other)),
    }
}

/// Computes the failover mode, the master determination and the member modes of a decoded
/// reply.
///
/// Only the answering instance knows whether it is writable. With more than one member, or
/// when the answering instance is not among the members, the master cannot be determined and
/// is reported as [Master::Unknown].
pub fn classify(info: CConfigInfo) -> Replicaset {
    let CConfigInfo { uuid, leader_uuid, alias, failover, instance_uuid, instance_rw, instances } = info;

    let is_self = |instance: &CConfigInstanceInfo| instance.uuid == instance_uuid;
    let self_mode = if instance_rw { Mode::RW } else { Mode::Read };

    let master = match instances.as_slice() {
        [] => Master::No,
        [only] if is_self(only) && instance_rw => Master::Single,
        [only] if is_self(only) => Master::No,
        _ => Master::Unknown,
    };

    let instances = instances.into_iter()
        .map(|instance| {
            let mode = if is_self(&instance) { self_mode } else { Mode::Unknown };
            Instance {
                alias: instance.alias,
                uuid: instance.uuid,
                uri: instance.uri,
                mode,
            }
        })
        .collect();

    Replicaset {
        uuid,
        leader_uuid,
        alias,
        master,
        failover: Failover::from_name(&failover),
        instances,
    }
}

impl CConfigInstance {
    pub fn new(evaler: Arc<dyn Evaler>) -> Self {
        CConfigInstance { evaler }
    }
    /// Turns one raw reply into an aggregate. A reply that fails to decode yields no
    /// replicaset at all.
    pub fn parse_response(data: Vec<Value>) -> Result<Replicasets> {
        match decode_reply(data)? {
            CConfigReply::NotBootstrapped => {
                Ok(Replicasets::new(State::NotBootstrapped, Orchestrator::CentralizedConfig))
            },
            CConfigReply::Bootstrapped(info) => {
                let mut replicasets = Replicasets::new(State::Bootstrapped, Orchestrator::CentralizedConfig);
                replicasets.replicasets.push(classify(info));
                Ok(replicasets)
            },
        }
    }
}

impl ReplicasetsGetter for CConfigInstance {
    fn get_replicasets(&self) -> Result<Replicasets> {
        let timer = Instant::now();
        let data = self.evaler
            .eval(GET_REPLICASETS_QUERY, &[])
            .map_err(ReplicasetError::Boundary)?;
        debug!("topology query answered in {:?}", timer.elapsed());
        CConfigInstance::parse_response(data)
    }
}

impl CConfigApplication {
    pub fn new(
        targets: Vec<EvalTarget>,
        options: EvalOptions,
    ) -> Self
    {
        CConfigApplication { targets, options }
    }
    /// Queries every instance and folds the answers in instance order.
    ///
    /// Instances that fail are collected in the report. Only when every instance fails is the
    /// resolution itself a failure, carrying all of them.
    pub fn resolve(&self) -> Result<ApplicationReport> {
        let results = eval_targets(GET_REPLICASETS_QUERY, &[], &self.targets, &self.options)?;

        let mut merger = ReplicasetsMerger::new(Orchestrator::CentralizedConfig);
        let mut failures = Vec::new();
        let mut succeeded = 0;

        for target_result in results {
            match target_result.result.and_then(CConfigInstance::parse_response) {
                Ok(replicasets) => {
                    succeeded += 1;
                    merger.add(&target_result.target, replicasets);
                },
                Err(error) => {
                    warn!("{}: failed to get replicasets: {}", target_result.target, error);
                    failures.push(InstanceFailure {
                        instance: target_result.target,
                        timestamp: target_result.timestamp,
                        error,
                    });
                },
            }
        }

        if succeeded == 0 && !failures.is_empty() {
            return Err(ReplicasetError::Aggregate(failures));
        }
        if self.targets.is_empty() {
            warn!("the application has no instances to query");
        }

        Ok(ApplicationReport {
            replicasets: merger.finish(),
            failures,
        })
    }
}

impl ReplicasetsGetter for CConfigApplication {
    fn get_replicasets(&self) -> Result<Replicasets> {
        let report = self.resolve()?;
        if !report.failures.is_empty() {
            info!("replicasets resolved without {} of {} instances", report.failures.len(), self.targets.len());
        }
        Ok(report.replicasets)
    }
}
