//! # Call Layer
//!
//! A [`Call`] is the per-invocation handle handed to the caller. It is
//! executed synchronously with [`Call::execute`], or scheduled with
//! [`Call::enqueue`] and a [`Callback`] that receives the [`Outcome`].
//!
//! Every call carries a monotonic cancellation flag. Cancelling is
//! cooperative: it prevents a call that has not started from running and is
//! observed as [`Status::Canceled`](crate::Status::Canceled); work already in
//! flight is never interrupted.

use crate::{
    args::JobValue,
    error::{JobError, JobResult},
    outcome::Outcome,
    status::Status,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// A per-invocation call handle.
///
/// Implementations must never let a fault escape: both [`execute`] and the
/// callback delivered by [`enqueue`] always carry an [`Outcome`].
///
/// [`execute`]: Call::execute
/// [`enqueue`]: Call::enqueue
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Call<{T}>`",
    label = "missing `Call<{T}>` implementation",
    note = "Calls must implement `execute`, `enqueue`, `cancel` and `clone_call`."
)]
pub trait Call<T>: Send + Sync {
    /// Run the call on the current thread and return its outcome.
    fn execute(&self) -> Outcome<T>;

    /// Schedule the call and deliver its outcome to `callback`.
    ///
    /// Never blocks. Fails when the executor refuses the task; the callback
    /// is then never invoked.
    fn enqueue(&self, callback: Box<dyn Callback<T>>) -> JobResult<()>;

    /// Set the cancellation flag.
    fn cancel(&self);

    /// Whether [`cancel`](Call::cancel) was called on this handle.
    fn is_canceled(&self) -> bool;

    /// A fresh call sharing the same job and arguments with its own,
    /// reset cancellation state.
    fn clone_call(&self) -> Box<dyn Call<T>>;
}

/// A call whose value is type erased.
pub type RawCall = Box<dyn Call<JobValue>>;

impl<T, C: Call<T> + ?Sized> Call<T> for Box<C> {
    fn execute(&self) -> Outcome<T> {
        (**self).execute()
    }

    fn enqueue(&self, callback: Box<dyn Callback<T>>) -> JobResult<()> {
        (**self).enqueue(callback)
    }

    fn cancel(&self) {
        (**self).cancel()
    }

    fn is_canceled(&self) -> bool {
        (**self).is_canceled()
    }

    fn clone_call(&self) -> Box<dyn Call<T>> {
        (**self).clone_call()
    }
}

/// Receiver of an asynchronous outcome. Exactly one method is called, once.
pub trait Callback<T>: Send + 'static {
    /// The call completed.
    fn on_response(self: Box<Self>, outcome: Outcome<T>);

    /// The call failed or was canceled. `cause` is the error carried by the
    /// outcome, if any.
    fn on_failure(self: Box<Self>, outcome: Outcome<T>, cause: Option<Arc<JobError>>);
}

impl<T: 'static> dyn Callback<T> {
    /// Route `outcome` to the matching method: `on_response` for
    /// [`Status::Complete`], `on_failure` for everything else.
    pub fn deliver(self: Box<Self>, outcome: Outcome<T>) {
        if outcome.status() == Status::Complete && !outcome.is_error() {
            self.on_response(outcome);
        } else {
            let cause = outcome.error().cloned();
            self.on_failure(outcome, cause);
        }
    }
}

/// A [`Callback`] built from two closures.
pub struct FnCallback<R, F> {
    on_response: R,
    on_failure: F,
}

impl<T, R, F> Callback<T> for FnCallback<R, F>
where
    R: FnOnce(Outcome<T>) + Send + 'static,
    F: FnOnce(Outcome<T>, Option<Arc<JobError>>) + Send + 'static,
{
    fn on_response(self: Box<Self>, outcome: Outcome<T>) {
        (self.on_response)(outcome)
    }

    fn on_failure(self: Box<Self>, outcome: Outcome<T>, cause: Option<Arc<JobError>>) {
        (self.on_failure)(outcome, cause)
    }
}

/// Build a boxed callback from a success and a failure closure.
pub fn callback<T, R, F>(on_response: R, on_failure: F) -> Box<dyn Callback<T>>
where
    T: 'static,
    R: FnOnce(Outcome<T>) + Send + 'static,
    F: FnOnce(Outcome<T>, Option<Arc<JobError>>) + Send + 'static,
{
    Box::new(FnCallback {
        on_response,
        on_failure,
    })
}

/// A cancellation flag that, once set, stays set.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A new, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the flag is set.
    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
