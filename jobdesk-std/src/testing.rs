//! Testing utilities for jobdesk.
//!
//! # Features
//!
//! - [`RecordingCallback`]: A callback that records every outcome it receives
//! - [`ManualExecutor`]: An executor that holds tasks until told to run them
//! - [`CountingWorker`]: A worker that counts its invocations

use crate::registry::CapabilityDescriptor;
use jobdesk_core::{
    Callback, Executor, JobArgs, JobError, JobResult, JobValue, Outcome, Signature, Status, Task,
};
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

// ============================================================================
// Recording Callback
// ============================================================================

#[derive(Default)]
struct Recorded {
    statuses: Vec<Status>,
    messages: Vec<Option<String>>,
    causes: Vec<Option<Arc<JobError>>>,
    responses: usize,
    failures: usize,
}

/// A callback that records every outcome delivered to it.
///
/// Clones share the same record, so keep one and box another:
///
/// ```rust
/// use jobdesk_core::{Outcome, Status};
/// use jobdesk_std::testing::RecordingCallback;
///
/// let recorder = RecordingCallback::<bool>::new();
/// recorder.boxed().deliver(Outcome::complete(true, "ok"));
/// assert_eq!(recorder.statuses(), vec![Status::Complete]);
/// ```
pub struct RecordingCallback<T> {
    record: Arc<Mutex<Recorded>>,
    values: Arc<Mutex<Vec<T>>>,
}

impl<T: Send + 'static> RecordingCallback<T> {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            record: Arc::new(Mutex::new(Recorded::default())),
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A boxed callback writing into this recorder.
    pub fn boxed(&self) -> Box<dyn Callback<T>> {
        Box::new(self.clone())
    }

    /// Statuses in delivery order.
    pub fn statuses(&self) -> Vec<Status> {
        self.record.lock().unwrap().statuses.clone()
    }

    /// Messages in delivery order.
    pub fn messages(&self) -> Vec<Option<String>> {
        self.record.lock().unwrap().messages.clone()
    }

    /// Failure causes in delivery order (`None` for responses).
    pub fn causes(&self) -> Vec<Option<Arc<JobError>>> {
        self.record.lock().unwrap().causes.clone()
    }

    /// Number of `on_response` calls.
    pub fn responses(&self) -> usize {
        self.record.lock().unwrap().responses
    }

    /// Number of `on_failure` calls.
    pub fn failures(&self) -> usize {
        self.record.lock().unwrap().failures
    }

    /// Take the values delivered so far.
    pub fn take_values(&self) -> Vec<T> {
        std::mem::take(&mut *self.values.lock().unwrap())
    }

    fn push(&self, outcome: Outcome<T>, cause: Option<Arc<JobError>>, response: bool) {
        let mut record = self.record.lock().unwrap();
        record.statuses.push(outcome.status());
        record.messages.push(outcome.message().map(str::to_owned));
        record.causes.push(cause);
        if response {
            record.responses += 1;
        } else {
            record.failures += 1;
        }
        drop(record);
        if let Some(value) = outcome.into_value() {
            self.values.lock().unwrap().push(value);
        }
    }
}

impl<T: Send + 'static> Default for RecordingCallback<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RecordingCallback<T> {
    fn clone(&self) -> Self {
        Self {
            record: self.record.clone(),
            values: self.values.clone(),
        }
    }
}

impl<T: Send + 'static> Callback<T> for RecordingCallback<T> {
    fn on_response(self: Box<Self>, outcome: Outcome<T>) {
        self.push(outcome, None, true);
    }

    fn on_failure(self: Box<Self>, outcome: Outcome<T>, cause: Option<Arc<JobError>>) {
        self.push(outcome, cause, false);
    }
}

// ============================================================================
// Manual Executor
// ============================================================================

/// An executor that queues tasks until [`run_all`](ManualExecutor::run_all)
/// or [`run_next`](ManualExecutor::run_next) is called.
///
/// Optionally refuses submissions to simulate a saturated backend.
#[derive(Clone, Default)]
pub struct ManualExecutor {
    tasks: Arc<Mutex<VecDeque<Task>>>,
    refuse: Arc<Mutex<bool>>,
}

impl ManualExecutor {
    /// Create an empty executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse (or accept again) new submissions.
    pub fn set_refusing(&self, refuse: bool) {
        *self.refuse.lock().unwrap() = refuse;
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    /// Run the oldest queued task. Returns `false` when there was none.
    pub fn run_next(&self) -> bool {
        let task = self.tasks.lock().unwrap().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run queued tasks, including ones they submit, until none is left.
    /// Returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }
}

impl Executor for ManualExecutor {
    fn execute(&self, task: Task) -> JobResult<()> {
        if *self.refuse.lock().unwrap() {
            return Err(JobError::other("manual executor is refusing tasks"));
        }
        self.tasks.lock().unwrap().push_back(task);
        Ok(())
    }
}

// ============================================================================
// Counting Worker
// ============================================================================

/// A worker that counts its invocations and returns a fixed value.
///
/// # Example
///
/// ```rust
/// use jobdesk_core::{JobArgs, Signature, TypeShape};
/// use jobdesk_std::testing::CountingWorker;
///
/// let worker = CountingWorker::returning(true);
/// let descriptor = worker.descriptor("pickup_stones", Signature::new(vec![], TypeShape::of::<bool>()));
/// descriptor.invoke(&JobArgs::empty()).unwrap();
/// assert_eq!(worker.count(), 1);
/// ```
#[derive(Clone)]
pub struct CountingWorker {
    count: Arc<AtomicUsize>,
    produce: Arc<dyn Fn() -> JobValue + Send + Sync>,
}

impl CountingWorker {
    /// A worker returning a clone of `value` on every call.
    pub fn returning<T: Clone + Send + Sync + 'static>(value: T) -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
            produce: Arc::new(move || Box::new(value.clone()) as JobValue),
        }
    }

    /// A descriptor binding this worker to `job_name`.
    pub fn descriptor(&self, job_name: &str, signature: Signature) -> CapabilityDescriptor {
        let worker = self.clone();
        CapabilityDescriptor::new(
            job_name,
            "jobdesk_std::testing::CountingWorker",
            "work",
            signature,
            move |_: &JobArgs| {
                worker.count.fetch_add(1, Ordering::SeqCst);
                Ok((worker.produce)())
            },
        )
    }

    /// Number of invocations so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset the counter.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}
