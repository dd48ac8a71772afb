//! Module for evaluating queries on remote instances.
//!
//! The transport to a single instance is not implemented here: it is anything that implements
//! [Evaler]. This module provides:
//! - [eval_targets]: evaluates one query on a list of [EvalTarget] with bounded parallelism, a
//!   per-call timeout and cancellation, returning one [TargetResult] per target in order.
//! - [ReplayEvaler]: an evaler returning a reply captured earlier in a file.
//!
mod structs;
mod functions;

pub use structs::*;
pub use functions::*;
