//! Orchestrator discovery and the getter factory.
//!
//! The orchestrator kind decides which [ReplicasetsGetter] understands the topology of an
//! instance. Only the centralized configuration has a getter so far.
use std::sync::Arc;
use serde_json::Value;
use log::*;
use crate::cconfig::CConfigInstance;
use crate::error::{ReplicasetError, Result};
use crate::evaler::Evaler;
use crate::replicaset::{Orchestrator, ReplicasetsGetter};

pub const DISCOVER_ORCHESTRATOR_QUERY: &str = r#"
if rawget(_G, 'cartridge') ~= nil or package.loaded['cartridge'] ~= nil then
    return 'cartridge'
end
local ok, config = pcall(require, 'config')
if ok and config:info().status ~= 'uninitialized' then
    return 'centralized config'
end
return 'custom'
"#;

/// Asks the instance behind `evaler` which orchestrator manages it.
pub fn discover_orchestrator(evaler: &dyn Evaler) -> Result<Orchestrator> {
    let data = evaler
        .eval(DISCOVER_ORCHESTRATOR_QUERY, &[])
        .map_err(ReplicasetError::Boundary)?;
    parse_orchestrator(data)
}

fn parse_orchestrator(data: Vec<Value>) -> Result<Orchestrator> {
    if let [Value::String(name)] = data.as_slice() {
        let orchestrator = Orchestrator::from_name(name);
        debug!("orchestrator reported as '{}': {}", name, orchestrator);
        return Ok(orchestrator);
    }
    Err(ReplicasetError::response_shape(data))
}

/// Returns the instance scoped getter for an orchestrator kind.
pub fn new_replicasets_getter(
    orchestrator: Orchestrator,
    evaler: Arc<dyn Evaler>,
) -> Result<Box<dyn ReplicasetsGetter>>
{
    match orchestrator {
        Orchestrator::CentralizedConfig => Ok(Box::new(CConfigInstance::new(evaler))),
        other => Err(ReplicasetError::Unsupported(other.to_string())),
    }
}
