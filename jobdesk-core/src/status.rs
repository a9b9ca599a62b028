//! Terminal states of a single job invocation.

use std::fmt;

/// Classification of a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A worker was found but invoking it failed.
    WorkersTrouble,
    /// Discovery failed unrecoverably for a namespace.
    FindersTrouble,
    /// No worker is registered under the requested job name.
    WorkersNotFound,
    /// A contract violation detected before any invocation was attempted.
    Fatal,
    /// Anything not otherwise classified.
    Other,
}

impl ErrorKind {
    /// Stable lowercase name, used in messages and logs.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::WorkersTrouble => "workers trouble",
            ErrorKind::FindersTrouble => "finders trouble",
            ErrorKind::WorkersNotFound => "workers not found",
            ErrorKind::Fatal => "fatal",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The status carried by an [`Outcome`](crate::Outcome).
///
/// Every variant is terminal: dispatch itself is not modelled as a state
/// machine, only the final state of one invocation is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// The job ran and produced a value.
    #[default]
    Complete,
    /// The call was canceled before it started.
    Canceled,
    /// The call failed.
    Error(ErrorKind),
}

impl Status {
    /// Always `true`; kept as a named predicate so callers can state intent.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Status::Complete | Status::Canceled | Status::Error(_))
    }

    /// Returns the error kind, if this is an error status.
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Status::Error(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl From<ErrorKind> for Status {
    fn from(kind: ErrorKind) -> Self {
        Status::Error(kind)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Complete => f.write_str("complete"),
            Status::Canceled => f.write_str("canceled"),
            Status::Error(kind) => write!(f, "error ({kind})"),
        }
    }
}
