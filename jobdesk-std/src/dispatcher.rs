//! # Dispatcher
//!
//! Turns a job offer method call into a call object of the declared shape.
//!
//! For each [`JobMethod`] the dispatcher:
//!
//! 1. picks an adapter for the declared return shape (cached per method),
//! 2. resolves the method to a bound job using the adapter's result type,
//! 3. builds a [`JobCall`] over the arguments,
//! 4. lets the adapter decorate it and converts it with [`FromCall`].
//!
//! Contract violations found on the way are returned as `Err` with
//! [`ErrorKind::Fatal`](jobdesk_core::ErrorKind::Fatal). A missing worker is
//! not a violation: the call is built and reports `WorkersNotFound` when it
//! runs.

use crate::{
    adapter::{AdapterFactory, CallAdapter, CallAdapterFactory, OutcomeAdapterFactory},
    context::JobContext,
    discovery::Discovery,
    job_call::JobCall,
    verbose::verbose,
};
use jobdesk_core::{
    Call, FromCall, JobArgs, JobError, JobMethod, JobMethodKey, JobResult, SharedExecutor,
    TypeShape,
};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

/// Builds call objects for job offer methods.
///
/// Cloning is cheap; clones share the adapter cache.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    context: JobContext,
    factories: Vec<Arc<dyn AdapterFactory>>,
    callback_executor: Option<SharedExecutor>,
    executor: Option<SharedExecutor>,
    discover_on_demand: bool,
    adapters: RwLock<HashMap<JobMethodKey, Arc<dyn CallAdapter>>>,
}

impl Dispatcher {
    /// Start configuring a dispatcher over `context`.
    pub fn builder(context: &JobContext) -> DispatcherBuilder {
        DispatcherBuilder {
            context: context.clone(),
            factories: Vec::new(),
            callback_executor: None,
            executor: None,
            discover_on_demand: false,
        }
    }

    /// The context this dispatcher resolves against.
    pub fn context(&self) -> &JobContext {
        &self.inner.context
    }

    /// Executor used to deliver callbacks, if any.
    pub fn callback_executor(&self) -> Option<&SharedExecutor> {
        self.inner.callback_executor.as_ref()
    }

    /// The adapter for `shape` from the first factory after `skip_past`
    /// that handles it.
    ///
    /// With `skip_past == None` the whole chain is searched. Layered
    /// factories pass themselves to delegate to whatever comes next.
    pub fn next_adapter(
        &self,
        skip_past: Option<&dyn AdapterFactory>,
        shape: &TypeShape,
    ) -> JobResult<Arc<dyn CallAdapter>> {
        let start = match skip_past {
            Some(skipped) => self
                .inner
                .factories
                .iter()
                .position(|factory| std::ptr::addr_eq(Arc::as_ptr(factory), skipped))
                .map_or(0, |index| index + 1),
            None => 0,
        };
        for factory in &self.inner.factories[start..] {
            if let Some(adapter) = factory.get(shape, self)? {
                return Ok(adapter);
            }
        }
        Err(JobError::fatal(format!("no adapter found for `{shape}`")))
    }

    fn adapter_for(&self, method: &JobMethod) -> JobResult<Arc<dyn CallAdapter>> {
        let key = method.key();
        let cached = self
            .inner
            .adapters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(adapter) = cached {
            return Ok(adapter);
        }
        let adapter = self.next_adapter(None, method.return_shape())?;
        let mut adapters = self
            .inner
            .adapters
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(adapters.entry(key).or_insert(adapter).clone())
    }

    fn discover_if_needed(&self, method: &JobMethod) {
        let registry = self.inner.context.registry();
        if !self.inner.discover_on_demand || registry.has_providers() {
            return;
        }
        let namespaces = method.offer_namespaces();
        if namespaces.is_empty() {
            return;
        }
        verbose!(method = %method.key(), "running discovery on demand");
        let outcome = Discovery::new(&self.inner.context)
            .namespaces(namespaces.iter().copied())
            .entry()
            .execute();
        if let Some(err) = outcome.error() {
            tracing::warn!(method = %method.key(), error = %err, "on-demand discovery failed");
        }
    }

    /// Build the call object for `method` over `args`.
    ///
    /// # Errors
    ///
    /// `Fatal` when no adapter handles the declared shape, the shape is
    /// malformed, the method has no job name, or its parameters disagree
    /// with the registered worker.
    pub fn call<R: FromCall>(&self, method: &JobMethod, args: JobArgs) -> JobResult<R> {
        let adapter = self.adapter_for(method)?;
        self.discover_if_needed(method);
        let job = self
            .inner
            .context
            .resolver()
            .resolve(method, adapter.response_type())?;
        let executor = self
            .inner
            .executor
            .clone()
            .unwrap_or_else(|| self.inner.context.backend().clone());
        verbose!(method = %method.key(), args = %args, "call built");
        R::from_call(adapter.adapt(Box::new(JobCall::new(job, args, executor))))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("factories", &self.inner.factories.len())
            .field("callback_executor", &self.inner.callback_executor.is_some())
            .field("executor", &self.inner.executor.is_some())
            .field("discover_on_demand", &self.inner.discover_on_demand)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    context: JobContext,
    factories: Vec<Arc<dyn AdapterFactory>>,
    callback_executor: Option<SharedExecutor>,
    executor: Option<SharedExecutor>,
    discover_on_demand: bool,
}

impl DispatcherBuilder {
    /// Deliver callbacks through `executor`.
    pub fn callback_executor(mut self, executor: SharedExecutor) -> Self {
        self.callback_executor = Some(executor);
        self
    }

    /// Add a factory. Factories are consulted in the order they are added,
    /// before the standard ones.
    pub fn add_adapter_factory(mut self, factory: impl AdapterFactory) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Run enqueued calls on `executor` instead of the context's backend.
    pub fn executor(mut self, executor: SharedExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Scan the offer's namespaces on the first call if nothing has been
    /// discovered yet. Off by default.
    pub fn discover_on_demand(mut self, enabled: bool) -> Self {
        self.discover_on_demand = enabled;
        self
    }

    /// Build the dispatcher.
    pub fn build(self) -> Dispatcher {
        let mut factories = self.factories;
        factories.push(Arc::new(CallAdapterFactory));
        factories.push(Arc::new(OutcomeAdapterFactory));
        Dispatcher {
            inner: Arc::new(DispatcherInner {
                context: self.context,
                factories,
                callback_executor: self.callback_executor,
                executor: self.executor,
                discover_on_demand: self.discover_on_demand,
                adapters: RwLock::new(HashMap::new()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapter::{CALL_HANDLE, PassThroughAdapter},
        backend::InlineExecutor,
        testing::{CountingWorker, ManualExecutor, RecordingCallback},
    };
    use jobdesk_core::{
        Call, CallHandle, ErrorKind, JobValue, Outcome, RawCall, Signature, Status, job_args,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pickup_stones() -> JobMethod {
        JobMethod::new("StoneOffer", "pickup_stones")
            .job_name("pickup_stones")
            .param(TypeShape::of::<String>())
            .param(TypeShape::of::<i32>())
            .returns(TypeShape::parameterized(
                CALL_HANDLE,
                vec![TypeShape::of::<bool>()],
            ))
    }

    fn stone_signature() -> Signature {
        Signature::new(
            vec![TypeShape::of::<String>(), TypeShape::of::<i32>()],
            TypeShape::of::<bool>(),
        )
    }

    fn context_with_worker(worker: &CountingWorker) -> JobContext {
        let context = JobContext::builder()
            .executor(Arc::new(InlineExecutor))
            .build();
        context
            .registry()
            .register("pickup_stones", worker.descriptor("pickup_stones", stone_signature()))
            .unwrap();
        context
    }

    #[test]
    fn call_resolves_and_runs_the_worker() {
        let worker = CountingWorker::returning(true);
        let dispatcher = Dispatcher::builder(&context_with_worker(&worker)).build();
        let call: CallHandle<bool> = dispatcher
            .call(&pickup_stones(), job_args!["red".to_string(), 3])
            .unwrap();
        let outcome = call.execute();
        assert_eq!(outcome.status(), Status::Complete);
        assert_eq!(outcome.into_value(), Some(true));
        assert_eq!(worker.count(), 1);
    }

    #[test]
    fn outcome_shape_executes_in_place() {
        let worker = CountingWorker::returning(true);
        let dispatcher = Dispatcher::builder(&context_with_worker(&worker)).build();
        let method = pickup_stones().returns(TypeShape::parameterized(
            "Outcome",
            vec![TypeShape::of::<bool>()],
        ));
        let outcome: Outcome<bool> = dispatcher
            .call(&method, job_args!["red".to_string(), 3])
            .unwrap();
        assert!(outcome.is_complete());
        assert_eq!(worker.count(), 1);
    }

    #[test]
    fn unknown_shape_is_fatal() {
        let dispatcher = Dispatcher::builder(&JobContext::new()).build();
        let method = pickup_stones().returns(TypeShape::parameterized(
            "Mystery",
            vec![TypeShape::of::<bool>()],
        ));
        let err = dispatcher
            .call::<CallHandle<bool>>(&method, JobArgs::empty())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(err.message().contains("no adapter found"));
    }

    #[test]
    fn missing_worker_surfaces_at_execution() {
        let dispatcher = Dispatcher::builder(&JobContext::new()).build();
        let call: CallHandle<bool> = dispatcher
            .call(&pickup_stones(), job_args!["red".to_string(), 3])
            .unwrap();
        let outcome = call.execute();
        assert_eq!(outcome.status(), Status::Error(ErrorKind::WorkersNotFound));
        assert!(outcome.error().unwrap().message().contains("pickup_stones"));
    }

    #[test]
    fn enqueue_uses_the_dispatcher_executor_and_callback_executor() {
        let worker = CountingWorker::returning(true);
        let work = ManualExecutor::new();
        let delivery = ManualExecutor::new();
        let dispatcher = Dispatcher::builder(&context_with_worker(&worker))
            .executor(Arc::new(work.clone()))
            .callback_executor(Arc::new(delivery.clone()))
            .build();
        let call: CallHandle<bool> = dispatcher
            .call(&pickup_stones(), job_args!["red".to_string(), 3])
            .unwrap();
        let recorder = RecordingCallback::<bool>::new();
        call.enqueue(recorder.boxed()).unwrap();

        assert_eq!(work.run_all(), 1);
        assert_eq!(worker.count(), 1);
        assert_eq!(recorder.responses(), 0);
        assert_eq!(delivery.run_all(), 1);
        assert_eq!(recorder.take_values(), vec![true]);
    }

    #[test]
    fn adapters_are_cached_per_method() {
        struct Counting(Arc<AtomicUsize>);

        impl AdapterFactory for Counting {
            fn get(
                &self,
                return_shape: &TypeShape,
                _dispatcher: &Dispatcher,
            ) -> JobResult<Option<Arc<dyn CallAdapter>>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(Some(Arc::new(PassThroughAdapter::new(
                    crate::adapter::single_parameter(return_shape, CALL_HANDLE)?,
                    None,
                ))))
            }
        }

        let asked = Arc::new(AtomicUsize::new(0));
        let worker = CountingWorker::returning(true);
        let dispatcher = Dispatcher::builder(&context_with_worker(&worker))
            .add_adapter_factory(Counting(asked.clone()))
            .build();
        for _ in 0..3 {
            dispatcher
                .call::<CallHandle<bool>>(&pickup_stones(), job_args!["red".to_string(), 3])
                .unwrap();
        }
        assert_eq!(asked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn layered_factory_delegates_past_itself() {
        struct Doubling;

        impl Call<JobValue> for DoublingCall {
            fn execute(&self) -> Outcome<JobValue> {
                let _ = self.0.execute();
                self.0.execute()
            }
            fn enqueue(&self, callback: Box<dyn jobdesk_core::Callback<JobValue>>) -> JobResult<()> {
                self.0.enqueue(callback)
            }
            fn cancel(&self) {
                self.0.cancel();
            }
            fn is_canceled(&self) -> bool {
                self.0.is_canceled()
            }
            fn clone_call(&self) -> Box<dyn Call<JobValue>> {
                Box::new(DoublingCall(self.0.clone_call()))
            }
        }

        struct DoublingCall(RawCall);

        struct DoublingAdapter(Arc<dyn CallAdapter>);

        impl CallAdapter for DoublingAdapter {
            fn response_type(&self) -> &TypeShape {
                self.0.response_type()
            }
            fn adapt(&self, call: RawCall) -> RawCall {
                Box::new(DoublingCall(self.0.adapt(call)))
            }
        }

        impl AdapterFactory for Doubling {
            fn get(
                &self,
                return_shape: &TypeShape,
                dispatcher: &Dispatcher,
            ) -> JobResult<Option<Arc<dyn CallAdapter>>> {
                let next = dispatcher.next_adapter(Some(self), return_shape)?;
                Ok(Some(Arc::new(DoublingAdapter(next))))
            }
        }

        let worker = CountingWorker::returning(true);
        let dispatcher = Dispatcher::builder(&context_with_worker(&worker))
            .add_adapter_factory(Doubling)
            .build();
        let call: CallHandle<bool> = dispatcher
            .call(&pickup_stones(), job_args!["red".to_string(), 3])
            .unwrap();
        assert!(call.execute().is_complete());
        assert_eq!(worker.count(), 2);
    }

    #[test]
    fn parameter_mismatch_is_an_error_from_call() {
        let worker = CountingWorker::returning(true);
        let dispatcher = Dispatcher::builder(&context_with_worker(&worker)).build();
        let method = JobMethod::new("StoneOffer", "pickup_stones")
            .job_name("pickup_stones")
            .param(TypeShape::of::<String>())
            .returns(TypeShape::parameterized(
                CALL_HANDLE,
                vec![TypeShape::of::<bool>()],
            ));
        let err = dispatcher
            .call::<CallHandle<bool>>(&method, job_args!["red".to_string()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert_eq!(worker.count(), 0);
    }
}
