//! The result envelope of one call attempt.

use crate::{
    error::{JobError, JobResult},
    status::{ErrorKind, Status},
};
use std::sync::Arc;

/// Immutable outcome of one invocation: value, status, message and error.
///
/// The error is shared (`Arc`) so that asynchronous failure callbacks can hand
/// out the cause alongside the envelope that carries it.
#[derive(Debug)]
pub struct Outcome<T> {
    value: Option<T>,
    status: Status,
    message: Option<String>,
    error: Option<Arc<JobError>>,
}

impl<T> Outcome<T> {
    /// Start building an outcome. The status defaults to [`Status::Complete`].
    pub fn builder() -> OutcomeBuilder<T> {
        OutcomeBuilder::new()
    }

    /// A completed outcome carrying `value`.
    pub fn complete(value: T, message: impl Into<String>) -> Self {
        Self::builder().value(value).message(message).build()
    }

    /// A canceled outcome. Cancellation carries no error.
    pub fn canceled() -> Self {
        Self::builder()
            .status(Status::Canceled)
            .message("Canceled")
            .build()
    }

    /// A failed outcome whose status mirrors the kind of `error`.
    pub fn failed(error: JobError) -> Self {
        let message = error.message().to_owned();
        Self::builder()
            .status(Status::Error(error.kind()))
            .message(message)
            .error(error)
            .build()
    }

    /// The produced value, if any.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consume the envelope and take the value.
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// The terminal status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Optional human readable message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The error, if the call failed.
    pub fn error(&self) -> Option<&Arc<JobError>> {
        self.error.as_ref()
    }

    /// `true` when an error is present and the status is terminal.
    ///
    /// An error recorded while a call is still in flight does not count.
    pub fn is_error(&self) -> bool {
        self.error.is_some() && self.status.is_terminal()
    }

    /// `true` when the status is [`Status::Complete`].
    pub fn is_complete(&self) -> bool {
        self.status == Status::Complete
    }

    /// Map the value, keeping status, message and error.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: self.value.map(f),
            status: self.status,
            message: self.message,
            error: self.error,
        }
    }

    /// Map the value with a fallible conversion. A conversion error turns the
    /// envelope into a failure of that error's kind.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> JobResult<U>) -> Outcome<U> {
        match self.value {
            Some(value) => match f(value) {
                Ok(converted) => Outcome {
                    value: Some(converted),
                    status: self.status,
                    message: self.message,
                    error: self.error,
                },
                Err(err) => Outcome::failed(err),
            },
            None => Outcome {
                value: None,
                status: self.status,
                message: self.message,
                error: self.error,
            },
        }
    }

    /// Rebuild this envelope as canceled, dropping the value.
    ///
    /// Used when a cancel arrives after the work ran but before the result
    /// was delivered.
    pub fn into_canceled(self) -> Outcome<T> {
        Outcome {
            value: None,
            status: Status::Canceled,
            message: Some("Canceled".to_owned()),
            error: self.error,
        }
    }

    /// Convert into a `Result`, treating every non-complete status as an
    /// error.
    pub fn into_result(self) -> Result<Option<T>, Arc<JobError>> {
        match (self.status, self.error) {
            (Status::Complete, None) => Ok(self.value),
            (_, Some(err)) => Err(err),
            (Status::Canceled, None) => Err(Arc::new(JobError::other("call was canceled"))),
            (status, None) => Err(Arc::new(JobError::new(
                status.error_kind().unwrap_or(ErrorKind::Other),
                self.message.unwrap_or_default(),
            ))),
        }
    }
}

/// Builder for [`Outcome`].
#[derive(Debug)]
pub struct OutcomeBuilder<T> {
    value: Option<T>,
    status: Status,
    message: Option<String>,
    error: Option<Arc<JobError>>,
}

impl<T> Default for OutcomeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OutcomeBuilder<T> {
    /// Create a builder with status `Complete` and nothing else set.
    pub fn new() -> Self {
        Self {
            value: None,
            status: Status::Complete,
            message: None,
            error: None,
        }
    }

    /// Set the value.
    pub fn value(mut self, value: T) -> Self {
        self.value = Some(value);
        self
    }

    /// Set the status.
    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Set the message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the error.
    pub fn error(mut self, error: impl Into<Arc<JobError>>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Freeze the envelope.
    pub fn build(self) -> Outcome<T> {
        Outcome {
            value: self.value,
            status: self.status,
            message: self.message,
            error: self.error,
        }
    }
}
