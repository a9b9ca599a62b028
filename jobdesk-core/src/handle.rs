//! Conversion from a raw call into the shape a job offer declares.

use crate::{
    args::JobValue,
    call::{Call, Callback, RawCall},
    error::{JobError, JobResult},
    outcome::Outcome,
};
use std::{any::type_name, fmt, marker::PhantomData, sync::Arc};

/// Build a declared return type from an adapted raw call.
///
/// The dispatcher runs the adapter chain first, then hands the decorated call
/// to `from_call`. Implemented by [`CallHandle`] and [`Outcome`]; libraries
/// add their own call-style types by implementing it next to a matching
/// adapter factory.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot be returned from a job offer method",
    label = "not a job return shape",
    note = "Return `CallHandle<T>`, `Outcome<T>`, or a type implementing `FromCall`."
)]
pub trait FromCall: Sized {
    /// Convert the call.
    fn from_call(call: RawCall) -> JobResult<Self>;
}

/// Take a value out of its type-erased box.
///
/// A mismatch is a [`WorkersTrouble`](crate::ErrorKind::WorkersTrouble) error.
pub fn downcast_value<T: 'static>(value: JobValue) -> JobResult<T> {
    value.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
        JobError::workers_trouble(format!(
            "worker returned a value that is not a `{}`",
            type_name::<T>()
        ))
    })
}

/// Typed view over a raw call.
///
/// Every operation passes straight through to the raw call; values are
/// downcast on the way out.
pub struct CallHandle<T> {
    raw: RawCall,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> CallHandle<T> {
    /// Wrap a raw call.
    pub fn new(raw: RawCall) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Unwrap the raw call.
    pub fn into_raw(self) -> RawCall {
        self.raw
    }
}

impl<T> fmt::Debug for CallHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallHandle")
            .field("value", &type_name::<T>())
            .field("canceled", &self.raw.is_canceled())
            .finish()
    }
}

impl<T: Send + 'static> Call<T> for CallHandle<T> {
    fn execute(&self) -> Outcome<T> {
        self.raw.execute().and_then(downcast_value::<T>)
    }

    fn enqueue(&self, callback: Box<dyn Callback<T>>) -> JobResult<()> {
        self.raw.enqueue(Box::new(Downcasting { inner: callback }))
    }

    fn cancel(&self) {
        self.raw.cancel()
    }

    fn is_canceled(&self) -> bool {
        self.raw.is_canceled()
    }

    fn clone_call(&self) -> Box<dyn Call<T>> {
        Box::new(CallHandle::<T>::new(self.raw.clone_call()))
    }
}

impl<T: Send + 'static> FromCall for CallHandle<T> {
    fn from_call(call: RawCall) -> JobResult<Self> {
        Ok(CallHandle::new(call))
    }
}

/// Declaring `Outcome<T>` executes the call synchronously at the call site.
impl<T: 'static> FromCall for Outcome<T> {
    fn from_call(call: RawCall) -> JobResult<Self> {
        Ok(call.execute().and_then(downcast_value::<T>))
    }
}

struct Downcasting<T> {
    inner: Box<dyn Callback<T>>,
}

impl<T: Send + 'static> Callback<JobValue> for Downcasting<T> {
    fn on_response(self: Box<Self>, outcome: Outcome<JobValue>) {
        self.inner.deliver(outcome.and_then(downcast_value::<T>));
    }

    fn on_failure(self: Box<Self>, outcome: Outcome<JobValue>, cause: Option<Arc<JobError>>) {
        self.inner
            .on_failure(outcome.and_then(downcast_value::<T>), cause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, Status, callback};
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc,
    };

    /// A raw call that always returns the same value.
    struct Fixed {
        value: fn() -> JobValue,
        canceled: AtomicBool,
        runs: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn new(value: fn() -> JobValue) -> Self {
            Self {
                value,
                canceled: AtomicBool::new(false),
                runs: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Call<JobValue> for Fixed {
        fn execute(&self) -> Outcome<JobValue> {
            if self.is_canceled() {
                return Outcome::canceled();
            }
            self.runs.fetch_add(1, Ordering::SeqCst);
            Outcome::complete((self.value)(), "Complete a task.")
        }

        fn enqueue(&self, callback: Box<dyn Callback<JobValue>>) -> JobResult<()> {
            callback.deliver(self.execute());
            Ok(())
        }

        fn cancel(&self) {
            self.canceled.store(true, Ordering::SeqCst);
        }

        fn is_canceled(&self) -> bool {
            self.canceled.load(Ordering::SeqCst)
        }

        fn clone_call(&self) -> Box<dyn Call<JobValue>> {
            Box::new(Fixed {
                value: self.value,
                canceled: AtomicBool::new(false),
                runs: self.runs.clone(),
            })
        }
    }

    #[test]
    fn handle_downcasts_values() {
        let handle = CallHandle::<bool>::from_call(Box::new(Fixed::new(|| Box::new(true)))).unwrap();
        let outcome = handle.execute();
        assert_eq!(outcome.get(), Some(&true));
        assert_eq!(outcome.status(), Status::Complete);
    }

    #[test]
    fn wrong_value_type_is_workers_trouble() {
        let handle = CallHandle::<bool>::new(Box::new(Fixed::new(|| Box::new(7_u8))));
        let outcome = handle.execute();
        assert_eq!(outcome.status(), Status::Error(ErrorKind::WorkersTrouble));
    }

    #[test]
    fn clone_resets_cancellation_and_shares_work() {
        let fixed = Fixed::new(|| Box::new(true));
        let runs = fixed.runs.clone();
        let handle = CallHandle::<bool>::new(Box::new(fixed));
        let copy = handle.clone_call();
        copy.cancel();
        assert!(!handle.is_canceled());
        assert_eq!(copy.execute().status(), Status::Canceled);
        assert!(handle.execute().is_complete());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn enqueue_delivers_typed_outcome() {
        let handle = CallHandle::<bool>::new(Box::new(Fixed::new(|| Box::new(true))));
        let (tx, rx) = mpsc::channel();
        let failures = Arc::new(Mutex::new(0));
        let seen = failures.clone();
        handle
            .enqueue(callback(
                move |o: Outcome<bool>| tx.send(o.into_value()).unwrap(),
                move |_, _| *seen.lock().unwrap() += 1,
            ))
            .unwrap();
        assert_eq!(rx.recv().unwrap(), Some(true));
        assert_eq!(*failures.lock().unwrap(), 0);
    }

    #[test]
    fn outcome_shape_executes_immediately() {
        let outcome = Outcome::<bool>::from_call(Box::new(Fixed::new(|| Box::new(false)))).unwrap();
        assert_eq!(outcome.into_value(), Some(false));
    }
}
