//! Error types for jobdesk.
//!
//! Every failure is a [`JobError`]: an [`ErrorKind`] from the status
//! taxonomy, a human readable message and an optional underlying cause.

use crate::status::ErrorKind;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the crate.
pub type JobResult<T> = Result<T, JobError>;

/// The single error type raised by resolution, invocation and discovery.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct JobError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<BoxError>,
}

impl JobError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the underlying cause.
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// A contract violation detected before invocation.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    /// No worker bound to the requested job name.
    pub fn workers_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WorkersNotFound, message)
    }

    /// Invoking a found worker failed.
    pub fn workers_trouble(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WorkersTrouble, message)
    }

    /// Discovery failed for a namespace.
    pub fn finders_trouble(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FindersTrouble, message)
    }

    /// Unclassified failure.
    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Other, message)
    }

    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message without the kind prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The underlying cause, if any.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Converts an arbitrary boxed error, keeping it as is when it already
    /// is a `JobError` and wrapping it under `kind` otherwise.
    pub fn from_boxed(err: BoxError, kind: ErrorKind, message: impl Into<String>) -> Self {
        match err.downcast::<JobError>() {
            Ok(job) => *job,
            Err(err) => JobError::new(kind, message).with_cause(err),
        }
    }
}
