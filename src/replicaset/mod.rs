//! The replicaset topology model.
//!
//! A [Replicasets] aggregate is what every orchestrator backend produces, and what the status
//! report and the administrative commands consume:
//! - the bootstrap [State] of the cluster.
//! - the [Orchestrator] kind that recorded the topology.
//! - the list of [Replicaset], each with its [Failover] mode, its [Master] determination and
//!   its members ([Instance]) with their [Mode].
//!
//! Backends implement [ReplicasetsGetter]. Callers only depend on that trait.
//!
//! Aggregates reported by several instances of one application are folded with
//! [ReplicasetsMerger].
//!
mod structs;
mod functions;

pub use structs::*;
