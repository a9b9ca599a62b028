//! The erased call object built by the dispatcher for each invocation.

use crate::{resolver::BoundJob, verbose::verbose};
use jobdesk_core::{
    Call, Callback, CancelFlag, JobArgs, JobResult, JobValue, Outcome, SharedExecutor,
};
use std::{fmt, sync::Arc};

/// Message carried by a completed outcome.
pub const COMPLETE_MESSAGE: &str = "Complete a task.";

/// One invocation of a bound job.
///
/// `execute` checks the cancellation flag, runs the worker once and wraps
/// whatever happened in an [`Outcome`]. `enqueue` submits the same work to
/// the executor chosen by the dispatcher and never blocks.
pub struct JobCall {
    job: Arc<BoundJob>,
    args: JobArgs,
    executor: SharedExecutor,
    canceled: CancelFlag,
}

impl JobCall {
    /// Create a call.
    pub fn new(job: Arc<BoundJob>, args: JobArgs, executor: SharedExecutor) -> Self {
        Self {
            job,
            args,
            executor,
            canceled: CancelFlag::new(),
        }
    }

    /// The bound job.
    pub fn job(&self) -> &Arc<BoundJob> {
        &self.job
    }

    /// The call arguments.
    pub fn args(&self) -> &JobArgs {
        &self.args
    }
}

fn run(job: &BoundJob, args: &JobArgs, canceled: &CancelFlag) -> Outcome<JobValue> {
    if canceled.is_canceled() {
        verbose!(job = job.job_name(), "call canceled before it started");
        return Outcome::canceled();
    }
    match job.run(args) {
        Ok(value) => Outcome::complete(value, COMPLETE_MESSAGE),
        Err(err) => Outcome::failed(err),
    }
}

impl Call<JobValue> for JobCall {
    fn execute(&self) -> Outcome<JobValue> {
        run(&self.job, &self.args, &self.canceled)
    }

    fn enqueue(&self, callback: Box<dyn Callback<JobValue>>) -> JobResult<()> {
        let job = self.job.clone();
        let args = self.args.clone();
        let canceled = self.canceled.clone();
        self.executor.execute(Box::new(move || {
            callback.deliver(run(&job, &args, &canceled));
        }))
    }

    fn cancel(&self) {
        self.canceled.cancel();
    }

    fn is_canceled(&self) -> bool {
        self.canceled.is_canceled()
    }

    fn clone_call(&self) -> Box<dyn Call<JobValue>> {
        Box::new(JobCall::new(
            self.job.clone(),
            self.args.clone(),
            self.executor.clone(),
        ))
    }
}

impl fmt::Debug for JobCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobCall")
            .field("job", &self.job.key())
            .field("args", &self.args)
            .field("canceled", &self.canceled.is_canceled())
            .finish()
    }
}
