use std::sync::Arc;
use crate::error::InstanceFailure;
use crate::evaler::{EvalOptions, EvalTarget, Evaler};
use crate::replicaset::Replicasets;

/// A decoded reply to the topology query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CConfigReply {
    Bootstrapped(CConfigInfo),
    /// The instance has not been configured yet, so it knows no replicaset.
    NotBootstrapped,
}

/// The replicaset as reported by the instance that answered the query.
///
/// `instance_uuid` and `instance_rw` describe the answering instance only: the query cannot
/// tell the read/write state of its peers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CConfigInfo {
    pub uuid: String,
    pub leader_uuid: String,
    pub alias: String,
    pub failover: String,
    pub instance_uuid: String,
    pub instance_rw: bool,
    pub instances: Vec<CConfigInstanceInfo>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CConfigInstanceInfo {
    pub alias: String,
    pub uuid: String,
    pub uri: String,
}

/// Resolves the replicasets through a single instance.
pub struct CConfigInstance {
    pub evaler: Arc<dyn Evaler>,
}

/// Resolves the replicasets of an application by querying every one of its instances.
pub struct CConfigApplication {
    pub targets: Vec<EvalTarget>,
    pub options: EvalOptions,
}

/// The merged topology of an application, with the instances that could not contribute.
#[derive(Debug)]
pub struct ApplicationReport {
    pub replicasets: Replicasets,
    pub failures: Vec<InstanceFailure>,
}
