//! # Adapter Layer
//!
//! Converts the raw call built by the dispatcher into the return shape a job
//! offer method declares.
//!
//! The dispatcher asks its [`AdapterFactory`] chain, in registration order,
//! for an adapter matching the declared shape. The first factory returning
//! `Some` wins. A factory recognizes shapes by the wrapper's name, checks
//! that the wrapper has exactly one type argument and unwraps it: that
//! argument is the worker's result type.
//!
//! Standard factories:
//!
//! - [`CallAdapterFactory`]: `CallHandle<T>`
//! - [`ShapeAdapterFactory`]: a library-defined call-style wrapper chosen by
//!   name, such as `WorkerCall<T>`
//! - [`OutcomeAdapterFactory`]: `Outcome<T>`, executed at the call site

use crate::{dispatcher::Dispatcher, verbose::verbose};
use jobdesk_core::{
    Call, Callback, CancelFlag, JobError, JobResult, JobValue, Outcome, RawCall, SharedExecutor,
    TypeShape,
};
use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

/// Wrapper name recognized by [`CallAdapterFactory`].
pub const CALL_HANDLE: &str = "CallHandle";

/// Wrapper name recognized by [`OutcomeAdapterFactory`].
pub const OUTCOME: &str = "Outcome";

/// Decorates raw calls for one declared return shape.
pub trait CallAdapter: Send + Sync {
    /// The worker's result type, unwrapped from the declared shape.
    fn response_type(&self) -> &TypeShape;

    /// Decorate `call`.
    fn adapt(&self, call: RawCall) -> RawCall;
}

/// Produces a [`CallAdapter`] for the shapes it understands.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an adapter factory",
    label = "missing `AdapterFactory` implementation",
    note = "Adapter factories return `Ok(None)` for shapes they do not handle."
)]
pub trait AdapterFactory: Send + Sync + 'static {
    /// An adapter for `return_shape`, `Ok(None)` if this factory does not
    /// handle it, or a `Fatal` error if it handles it but the shape is
    /// malformed.
    fn get(
        &self,
        return_shape: &TypeShape,
        dispatcher: &Dispatcher,
    ) -> JobResult<Option<Arc<dyn CallAdapter>>>;
}

/// The wrapper name of a shape: the raw name of a parameterized shape, or
/// the last path segment of a concrete type's name with generics stripped.
pub fn wrapper_name(shape: &TypeShape) -> Option<&'static str> {
    match shape {
        TypeShape::Parameterized { raw, .. } => Some(*raw),
        TypeShape::Concrete(tag) => {
            let name = tag.name();
            let path = name.split('<').next().unwrap_or(name);
            path.rsplit("::").next()
        }
        TypeShape::Variable(_) | TypeShape::Wildcard => None,
    }
}

/// Unwrap the single type argument of `shape`, which must be `raw<T>`.
pub fn single_parameter(shape: &TypeShape, raw: &str) -> JobResult<TypeShape> {
    match shape {
        TypeShape::Parameterized { args, .. } if args.len() == 1 => Ok(args[0].clone()),
        _ => Err(JobError::fatal(format!(
            "return type must be parameterized as `{raw}<T>`, found `{shape}`"
        ))),
    }
}

/// Adapter that leaves calls as they are, or reroutes callback delivery
/// through an executor.
pub struct PassThroughAdapter {
    response: TypeShape,
    callback_executor: Option<SharedExecutor>,
}

impl PassThroughAdapter {
    /// Create an adapter.
    pub fn new(response: TypeShape, callback_executor: Option<SharedExecutor>) -> Self {
        Self {
            response,
            callback_executor,
        }
    }
}

impl CallAdapter for PassThroughAdapter {
    fn response_type(&self) -> &TypeShape {
        &self.response
    }

    fn adapt(&self, call: RawCall) -> RawCall {
        match &self.callback_executor {
            Some(executor) => Box::new(CallbackDispatchCall::new(call, executor.clone())),
            None => call,
        }
    }
}

impl fmt::Debug for PassThroughAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassThroughAdapter")
            .field("response", &self.response)
            .field("callback_executor", &self.callback_executor.is_some())
            .finish()
    }
}

/// Handles `CallHandle<T>`.
///
/// Callbacks are delivered through the dispatcher's callback executor when
/// one is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallAdapterFactory;

impl AdapterFactory for CallAdapterFactory {
    fn get(
        &self,
        return_shape: &TypeShape,
        dispatcher: &Dispatcher,
    ) -> JobResult<Option<Arc<dyn CallAdapter>>> {
        ShapeAdapterFactory::new(CALL_HANDLE).get(return_shape, dispatcher)
    }
}

/// Handles a call-style wrapper chosen by name.
///
/// The wrapper type implements `FromCall` to receive the decorated raw call
/// and keeps execute, enqueue, cancel and clone semantics by forwarding to
/// it.
#[derive(Debug, Clone, Copy)]
pub struct ShapeAdapterFactory {
    raw: &'static str,
}

impl ShapeAdapterFactory {
    /// Handle wrappers named `raw`.
    pub const fn new(raw: &'static str) -> Self {
        Self { raw }
    }
}

impl AdapterFactory for ShapeAdapterFactory {
    fn get(
        &self,
        return_shape: &TypeShape,
        dispatcher: &Dispatcher,
    ) -> JobResult<Option<Arc<dyn CallAdapter>>> {
        if wrapper_name(return_shape) != Some(self.raw) {
            return Ok(None);
        }
        let response = single_parameter(return_shape, self.raw)?;
        verbose!(shape = %return_shape, response = %response, "call adapter selected");
        Ok(Some(Arc::new(PassThroughAdapter::new(
            response,
            dispatcher.callback_executor().cloned(),
        ))))
    }
}

/// Handles `Outcome<T>`: the call is executed where the method is called.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeAdapterFactory;

impl AdapterFactory for OutcomeAdapterFactory {
    fn get(
        &self,
        return_shape: &TypeShape,
        _dispatcher: &Dispatcher,
    ) -> JobResult<Option<Arc<dyn CallAdapter>>> {
        if wrapper_name(return_shape) != Some(OUTCOME) {
            return Ok(None);
        }
        let response = single_parameter(return_shape, OUTCOME)?;
        Ok(Some(Arc::new(PassThroughAdapter::new(response, None))))
    }
}

/// A call whose callback is delivered through an executor.
///
/// A cancel that arrives after the work finished but before the callback
/// runs turns the delivery into `on_failure` with a canceled outcome.
pub struct CallbackDispatchCall {
    raw: RawCall,
    executor: SharedExecutor,
    canceled: CancelFlag,
}

impl CallbackDispatchCall {
    /// Wrap `raw`.
    pub fn new(raw: RawCall, executor: SharedExecutor) -> Self {
        Self {
            raw,
            executor,
            canceled: CancelFlag::new(),
        }
    }
}

impl Call<JobValue> for CallbackDispatchCall {
    fn execute(&self) -> Outcome<JobValue> {
        self.raw.execute()
    }

    fn enqueue(&self, callback: Box<dyn Callback<JobValue>>) -> JobResult<()> {
        self.raw.enqueue(Box::new(Redispatch {
            inner: callback,
            executor: self.executor.clone(),
            canceled: self.canceled.clone(),
        }))
    }

    fn cancel(&self) {
        self.canceled.cancel();
        self.raw.cancel();
    }

    fn is_canceled(&self) -> bool {
        self.canceled.is_canceled() || self.raw.is_canceled()
    }

    fn clone_call(&self) -> Box<dyn Call<JobValue>> {
        Box::new(CallbackDispatchCall::new(
            self.raw.clone_call(),
            self.executor.clone(),
        ))
    }
}

struct Redispatch {
    inner: Box<dyn Callback<JobValue>>,
    executor: SharedExecutor,
    canceled: CancelFlag,
}

impl Redispatch {
    /// Hand the delivery to the executor. If the executor refuses it, the
    /// callback fails inline with the refusal as cause.
    fn submit(self, outcome: Outcome<JobValue>, cause: Option<Arc<JobError>>, response: bool) {
        let Redispatch {
            inner,
            executor,
            canceled,
        } = self;
        let slot = Arc::new(Mutex::new(Some(inner)));
        let queued = Arc::clone(&slot);
        let submitted = executor.execute(Box::new(move || {
            let Some(inner) = take(&queued) else {
                return;
            };
            if response && canceled.is_canceled() {
                inner.on_failure(outcome.into_canceled(), None);
            } else if response {
                inner.on_response(outcome);
            } else {
                inner.on_failure(outcome, cause);
            }
        }));
        if let Err(err) = submitted {
            tracing::warn!(error = %err, "callback executor refused delivery");
            if let Some(inner) = take(&slot) {
                inner.deliver(Outcome::failed(
                    JobError::other("callback executor refused delivery").with_cause(err),
                ));
            }
        }
    }
}

fn take(slot: &Mutex<Option<Box<dyn Callback<JobValue>>>>) -> Option<Box<dyn Callback<JobValue>>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

impl Callback<JobValue> for Redispatch {
    fn on_response(self: Box<Self>, outcome: Outcome<JobValue>) {
        self.submit(outcome, None, true);
    }

    fn on_failure(self: Box<Self>, outcome: Outcome<JobValue>, cause: Option<Arc<JobError>>) {
        self.submit(outcome, cause, false);
    }
}
