//! Task submission seam.

use crate::error::JobResult;
use std::sync::Arc;

/// A unit of work handed to an [`Executor`].
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs tasks, now or later, on this thread or another.
///
/// `execute` must not block waiting for the task to finish. A refused task is
/// reported through the returned error and is dropped without running.
///
/// Closures of the shape `Fn(Task) -> JobResult<()>` implement this trait:
///
/// ```rust
/// use jobdesk_core::{Executor, JobResult, Task};
///
/// let inline = |task: Task| -> JobResult<()> {
///     task();
///     Ok(())
/// };
/// inline.execute(Box::new(|| println!("ran"))).unwrap();
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot run jobdesk tasks",
    label = "missing `Executor` implementation",
    note = "Implement `Executor` or pass a closure `Fn(Task) -> JobResult<()>`."
)]
pub trait Executor: Send + Sync + 'static {
    /// Submit a task.
    fn execute(&self, task: Task) -> JobResult<()>;
}

impl<F> Executor for F
where
    F: Fn(Task) -> JobResult<()> + Send + Sync + 'static,
{
    fn execute(&self, task: Task) -> JobResult<()> {
        self(task)
    }
}

/// A shared, type-erased executor.
pub type SharedExecutor = Arc<dyn Executor>;
