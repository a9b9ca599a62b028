//! # jobdesk-core
//!
//! Core types and traits for the jobdesk job dispatch framework.
//!
//! This crate holds everything a job offer or a worker library needs to
//! compile against without pulling in the registry, discovery or execution
//! machinery of `jobdesk-std`.
//!
//! # Building Blocks
//!
//! - [`Outcome`] and [`Status`]: the envelope every invocation produces, with
//!   the closed set of terminal states and the [`ErrorKind`] taxonomy.
//! - [`Call`] and [`Callback`]: the per-invocation handle, executed
//!   synchronously or enqueued with a callback, plus cooperative cancellation.
//! - [`Executor`]: where enqueued calls run.
//! - [`JobMethod`] and [`JobOffer`]: caller-side declarations of named jobs.
//! - [`TypeShape`] and [`Signature`]: runtime type descriptors used to check
//!   that a declaration and a worker agree.
//! - [`FromCall`] and [`CallHandle`]: conversion into the declared return
//!   shape.
//!
//! # Error Types
//!
//! - [`JobError`] - The single error type, classified by [`ErrorKind`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod args;
mod call;
mod error;
mod executor;
mod handle;
mod job;
mod outcome;
mod signature;
mod status;

// Re-exports
pub use args::{Arg, JobArgs, JobValue};
pub use call::{Call, Callback, CancelFlag, FnCallback, RawCall, callback};
pub use error::{BoxError, JobError, JobResult};
pub use executor::{Executor, SharedExecutor, Task};
pub use handle::{CallHandle, FromCall, downcast_value};
pub use job::{JobMethod, JobMethodKey, JobOffer};
pub use outcome::{Outcome, OutcomeBuilder};
pub use signature::{Signature, TypeShape, TypeTag, describe_call};
pub use status::{ErrorKind, Status};
