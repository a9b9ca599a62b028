//! # jobdesk-std
//!
//! Standard implementations for the jobdesk job dispatch framework.
//!
//! This crate provides:
//! - **Discovery**: [`discovery::Discovery`] scans namespaces for `#[worker]`
//!   providers through pluggable enumerators, catalogs and filters
//! - **Registry**: [`registry::Registry`] maps job names to capabilities
//! - **Resolution**: [`resolver::Resolver`] binds offer methods to workers once
//! - **Adapters**: [`adapter`] converts raw calls into declared return shapes
//! - **Dispatch**: [`dispatcher::Dispatcher`] builds call objects
//! - **Execution**: [`backend::BoundedExecutor`], the shared bounded backend
//! - **Context**: [`context::JobContext`] ties the above together
//! - **Testing**: [`testing`] helpers for callbacks, executors and workers

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use jobdesk_core;

// Modules
pub mod adapter;
pub mod backend;
pub mod call_ext;
pub mod context;
pub mod discovery;
pub mod dispatcher;
pub mod job_call;
pub mod registry;
pub mod resolver;
pub mod testing;
pub mod verbose;

pub use inventory;
pub use verbose::{is_verbose, set_verbose};
