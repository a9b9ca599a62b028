//! Future-based completion for call objects.
//!
//! There is no timeout at this layer. Awaiting [`CallExt::outcome`] lets a
//! caller race completion against a deadline with whatever runtime it uses.

use futures::channel::oneshot;
use jobdesk_core::{Call, Callback, JobError, JobResult, Outcome};
use std::{future::Future, pin::Pin, sync::Arc};

/// Boxed future resolving to a call's outcome.
pub type OutcomeFuture<T> = Pin<Box<dyn Future<Output = Outcome<T>> + Send + 'static>>;

/// Extension methods for every [`Call`].
pub trait CallExt<T: Send + 'static>: Call<T> {
    /// Enqueue the call and return a future of its outcome.
    ///
    /// # Errors
    ///
    /// Submission errors are returned at once. If the task is dropped
    /// without delivering, the future resolves to an `Other` error.
    fn outcome(&self) -> JobResult<OutcomeFuture<T>> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(Box::new(Completion(tx)))?;
        Ok(Box::pin(async move {
            rx.await.unwrap_or_else(|_| {
                Outcome::failed(JobError::other("call finished without delivering an outcome"))
            })
        }))
    }
}

impl<T: Send + 'static, C: Call<T> + ?Sized> CallExt<T> for C {}

struct Completion<T>(oneshot::Sender<Outcome<T>>);

impl<T: Send + 'static> Callback<T> for Completion<T> {
    fn on_response(self: Box<Self>, outcome: Outcome<T>) {
        // The receiver may be gone if the caller stopped waiting.
        let _ = self.0.send(outcome);
    }

    fn on_failure(self: Box<Self>, outcome: Outcome<T>, _cause: Option<Arc<JobError>>) {
        let _ = self.0.send(outcome);
    }
}
