//! Type-erased call arguments and return values.

use crate::error::{JobError, JobResult};
use std::{
    any::{Any, type_name},
    fmt,
    sync::Arc,
};

/// A worker's return value with its type erased.
pub type JobValue = Box<dyn Any + Send>;

/// A single call argument.
///
/// Implemented for every `Clone + Debug + Send + Sync + 'static` type, so
/// plain owned values (`String`, integers, user structs) can be passed as is.
pub trait Arg: Any + Send + Sync + fmt::Debug {
    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Name of the concrete type, for diagnostics.
    fn type_name(&self) -> &'static str;
}

impl<T> Arg for T
where
    T: Any + Clone + Send + Sync + fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Positional arguments of one job invocation.
///
/// Cheap to clone: cloned call objects share the same argument list.
#[derive(Clone)]
pub struct JobArgs(Arc<[Box<dyn Arg>]>);

impl JobArgs {
    /// Create an argument list.
    pub fn new(args: Vec<Box<dyn Arg>>) -> Self {
        Self(args.into())
    }

    /// An empty argument list.
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Clone out the argument at `index` as a `T`.
    ///
    /// A missing argument or a type mismatch is a
    /// [`WorkersTrouble`](crate::ErrorKind::WorkersTrouble) error.
    pub fn get<T: Any + Clone>(&self, index: usize) -> JobResult<T> {
        let arg: &dyn Arg = self.0.get(index).map(|arg| &**arg).ok_or_else(|| {
            JobError::workers_trouble(format!(
                "argument #{index} is missing, {} given",
                self.0.len()
            ))
        })?;
        arg.as_any().downcast_ref::<T>().cloned().ok_or_else(|| {
            JobError::workers_trouble(format!(
                "argument #{index} has type `{}`, expected `{}`",
                arg.type_name(),
                type_name::<T>()
            ))
        })
    }

    /// Iterate over the arguments.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Arg> {
        self.0.iter().map(|arg| &**arg)
    }
}

impl Default for JobArgs {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for JobArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Renders the arguments as `"red", 3`.
impl fmt::Display for JobArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg:?}")?;
        }
        Ok(())
    }
}

/// Build [`JobArgs`] from a list of expressions.
///
/// ```rust
/// use jobdesk_core::job_args;
///
/// let args = job_args!["red".to_string(), 3_i32];
/// assert_eq!(args.len(), 2);
/// assert_eq!(args.get::<i32>(1).unwrap(), 3);
/// ```
#[macro_export]
macro_rules! job_args {
    () => {
        $crate::JobArgs::empty()
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::JobArgs::new(::std::vec![
            $(::std::boxed::Box::new($arg) as ::std::boxed::Box<dyn $crate::Arg>),+
        ])
    };
}

#[cfg(test)]
mod tests {
    use crate::ErrorKind;

    #[test]
    fn get_clones_typed_values() {
        let args = job_args!["red".to_string(), 3_i32];
        assert_eq!(args.get::<String>(0).unwrap(), "red");
        assert_eq!(args.get::<i32>(1).unwrap(), 3);
    }

    #[test]
    fn mismatch_is_workers_trouble() {
        let args = job_args![3_i32];
        let err = args.get::<String>(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WorkersTrouble);
        assert!(err.message().contains("i32"));

        let err = args.get::<i32>(4).unwrap_err();
        assert!(err.message().contains("missing"));
    }

    #[test]
    fn display_prints_debug_values() {
        let args = job_args!["red".to_string(), 3_i32];
        assert_eq!(args.to_string(), "\"red\", 3");
        assert_eq!(job_args![].to_string(), "");
    }
}
