//! Resolution and classification of the replicaset topology of a Tarantool cluster.
//!
//! Raw, dynamically typed introspection replies of the instances are decoded, classified and
//! merged into a [replicaset::Replicasets] aggregate.
#[macro_use]
extern crate serde_derive;

pub mod error;
pub mod replicaset;
pub mod evaler;
pub mod cconfig;
pub mod discovery;
pub mod status;
pub mod utility;
