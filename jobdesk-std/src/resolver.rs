//! Job resolution: validate a declared method against the registry and bind
//! it to a worker.

use crate::{
    registry::{CapabilityDescriptor, Registry},
    verbose::verbose,
};
use jobdesk_core::{
    BoxError, JobArgs, JobError, JobMethod, JobMethodKey, JobResult, JobValue, TypeShape,
    describe_call,
};
use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// A declared method bound to the worker that serves it.
///
/// Built once per [`JobMethodKey`] and shared by every call to that method.
/// A job without a worker is never cached; running it reports
/// `WorkersNotFound`.
#[derive(Debug)]
pub struct BoundJob {
    key: JobMethodKey,
    job_name: String,
    worker: Option<Arc<CapabilityDescriptor>>,
    params: Vec<TypeShape>,
    result: TypeShape,
}

impl BoundJob {
    /// The declared method's identity.
    pub fn key(&self) -> JobMethodKey {
        self.key
    }

    /// The job name.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// The bound worker, if one was registered when this job was resolved.
    pub fn worker(&self) -> Option<&Arc<CapabilityDescriptor>> {
        self.worker.as_ref()
    }

    /// Declared parameter shapes.
    pub fn params(&self) -> &[TypeShape] {
        &self.params
    }

    /// The result type recovered from the declared return shape.
    pub fn result(&self) -> &TypeShape {
        &self.result
    }

    /// Invoke the worker once.
    ///
    /// Every failure past this point is `WorkersTrouble`, except a missing
    /// worker, which is `WorkersNotFound`. Panics are caught.
    pub fn run(&self, args: &JobArgs) -> JobResult<JobValue> {
        let worker = self.worker.as_ref().ok_or_else(|| {
            JobError::workers_not_found(format!(
                "worker for job `{}` is not found; run discovery over the namespaces of {} first",
                self.job_name, self.key
            ))
        })?;

        verbose!(job = %self.job_name, provider = worker.provider(), %args, "invoking worker");
        let value = match catch_unwind(AssertUnwindSafe(|| worker.invoke(args))) {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => return Err(self.trouble(worker, args).with_cause(err)),
            Err(payload) => {
                return Err(self.trouble(worker, args).with_cause(panic_message(payload)));
            }
        };

        if let Some(expected) = self.result.tag() {
            if (*value).type_id() != expected.id() {
                return Err(JobError::workers_trouble(format!(
                    "{}::{} returned a value that is not a `{}`",
                    worker.provider(),
                    worker.method(),
                    expected
                )));
            }
        }
        Ok(value)
    }

    fn trouble(&self, worker: &CapabilityDescriptor, args: &JobArgs) -> JobError {
        JobError::workers_trouble(format!(
            "could not invoke {}::{}, args: [{}]",
            worker.provider(),
            worker.method(),
            args
        ))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> BoxError {
    let message = match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_owned(),
            Err(_) => "worker panicked".to_owned(),
        },
    };
    message.into()
}

/// Validates declared methods and memoizes the bound jobs in a [`Registry`].
#[derive(Debug)]
pub struct Resolver {
    registry: Arc<Registry>,
    resolutions: AtomicUsize,
}

impl Resolver {
    /// Create a resolver over `registry`.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            resolutions: AtomicUsize::new(0),
        }
    }

    /// The registry consulted by this resolver.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// How many times validation actually ran. Cache hits are not counted.
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::Relaxed)
    }

    /// Bind `method` to its worker.
    ///
    /// `result` is the value type recovered from the declared return shape
    /// by the adapter. Contract violations are `Fatal`. An unknown job name
    /// is not an error here: the returned job has no worker and fails with
    /// `WorkersNotFound` when run.
    pub fn resolve(&self, method: &JobMethod, result: &TypeShape) -> JobResult<Arc<BoundJob>> {
        let key = method.key();
        if let Some(job) = self.registry.resolved_job(&key) {
            return Ok(job);
        }
        self.resolutions.fetch_add(1, Ordering::Relaxed);

        let job_name = match method.bound_job_name() {
            None => {
                return Err(JobError::fatal(format!(
                    "{} has no job name; annotate it with #[job(\"name\")]",
                    method.describe()
                )));
            }
            Some(name) if name.trim().is_empty() => {
                return Err(JobError::fatal(format!(
                    "{} has a blank job name",
                    method.describe()
                )));
            }
            Some(name) => name,
        };

        if result.has_unresolvable_type() || method.return_shape().has_unresolvable_type() {
            return Err(JobError::fatal(format!(
                "{} returns `{}`, which contains an unresolved type",
                method.describe(),
                method.return_shape()
            )));
        }

        let Some(worker) = self.registry.lookup(job_name) else {
            verbose!(job = job_name, method = %key, "no worker bound yet");
            return Ok(Arc::new(BoundJob {
                key,
                job_name: job_name.to_owned(),
                worker: None,
                params: method.params().to_vec(),
                result: result.clone(),
            }));
        };

        let signature = worker.signature();
        if !signature.has_equal_params(method.params()) {
            return Err(JobError::fatal(format!(
                "parameters of job `{job_name}` do not match: declared {}, implemented {}",
                method.describe(),
                describe_call(
                    &format!("{}::{}", worker.provider(), worker.method()),
                    signature.params()
                )
            )));
        }
        if signature.output().has_unresolvable_type() {
            return Err(JobError::fatal(format!(
                "{}::{} returns `{}`, which contains an unresolved type",
                worker.provider(),
                worker.method(),
                signature.output()
            )));
        }

        verbose!(job = job_name, method = %key, provider = worker.provider(), "resolved job");
        let job = Arc::new(BoundJob {
            key,
            job_name: job_name.to_owned(),
            worker: Some(worker),
            params: method.params().to_vec(),
            result: result.clone(),
        });
        Ok(self.registry.cache_resolved_job(key, job))
    }
}
