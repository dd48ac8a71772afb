//! Module for resolving replicasets of a cluster managed by the centralized configuration.
//!
//! Every instance answers [GET_REPLICASETS_QUERY] with a single mapping describing the
//! replicaset it belongs to:
//! - `uuid` (required), `leaderuuid`, `alias`, `failover`.
//! - `instanceuuid` and `instancerw`: the identity and the read/write state of the answering
//!   instance itself.
//! - `instances`: the members, each with `alias`, `uuid` and `uri`.
//!
//! An instance that is not configured yet answers `{bootstrapped = false}`.
//!
//! The reply is decoded by [decode_reply] and classified by [classify]. Two resolvers use them:
//! - [CConfigInstance]: asks one instance.
//! - [CConfigApplication]: asks all instances of an application and merges what they report.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
