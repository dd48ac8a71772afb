use std::collections::HashMap;
use crate::error::Result;

/// The bootstrap state of the cluster as seen by the instances that answered.
#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum State {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "bootstrapped")]
    Bootstrapped,
    #[serde(rename = "uninitialized")]
    NotBootstrapped,
}

/// The subsystem that records and decides topology and leadership.
#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Orchestrator {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "centralized config")]
    CentralizedConfig,
    #[serde(rename = "cartridge")]
    Cartridge,
    #[serde(rename = "custom")]
    Custom,
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Failover {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "off")]
    Off,
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "election")]
    Election,
    #[serde(rename = "supervised")]
    Supervised,
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Master {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "no")]
    No,
    #[serde(rename = "single")]
    Single,
    #[serde(rename = "multi")]
    Multi,
}

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "rw")]
    RW,
}

/// The result of a single resolution. It is built fresh for every query.
#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Replicasets {
    pub state: State,
    pub orchestrator: Orchestrator,
    pub replicasets: Vec<Replicaset>,
}

#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Replicaset {
    pub uuid: String,
    pub leader_uuid: String,
    pub alias: String,
    pub master: Master,
    pub failover: Failover,
    /// Members in the order the source reported them, duplicates included.
    pub instances: Vec<Instance>,
}

#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Instance {
    pub alias: String,
    pub uuid: String,
    pub uri: String,
    pub mode: Mode,
}

/// Anything that can produce a [Replicasets] aggregate: one implementation per orchestrator
/// kind and scope.
pub trait ReplicasetsGetter {
    fn get_replicasets(&self) -> Result<Replicasets>;
}

/// Folds the aggregates reported by several instances of one application into a single one.
#[derive(Debug, Default)]
pub struct ReplicasetsMerger {
    pub merged: Replicasets,
    /// Which instance first reported the value kept for a field, used to name both sides of a
    /// conflict.
    pub reporters: HashMap<String, String>,
}
