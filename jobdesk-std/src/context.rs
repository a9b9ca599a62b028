//! The explicit context shared by discovery and dispatch.

use crate::{
    backend::{BackendConfig, BoundedExecutor},
    registry::{ConflictPolicy, Registry},
    resolver::Resolver,
};
use jobdesk_core::SharedExecutor;
use std::{fmt, sync::Arc};

/// Registry, resolver and shared execution backend.
///
/// Cloning is cheap and yields a handle to the same state. Tests build one
/// context each to stay isolated.
#[derive(Clone)]
pub struct JobContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    registry: Arc<Registry>,
    resolver: Resolver,
    backend: SharedExecutor,
}

impl JobContext {
    /// A context with the default conflict policy and backend.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a context.
    pub fn builder() -> JobContextBuilder {
        JobContextBuilder::default()
    }

    /// The capability registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    /// The job resolver.
    pub fn resolver(&self) -> &Resolver {
        &self.inner.resolver
    }

    /// The shared backend used when a dispatch site has no executor of its
    /// own.
    pub fn backend(&self) -> &SharedExecutor {
        &self.inner.backend
    }

    /// Drop every binding, resolved job and recorded provider.
    pub fn flush(&self) {
        self.inner.registry.flush();
    }
}

impl Default for JobContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContext")
            .field("registry", &self.inner.registry)
            .field("resolutions", &self.inner.resolver.resolutions())
            .finish_non_exhaustive()
    }
}

/// Builder for [`JobContext`].
#[derive(Default)]
pub struct JobContextBuilder {
    policy: ConflictPolicy,
    backend: BackendConfig,
    executor: Option<SharedExecutor>,
}

impl JobContextBuilder {
    /// How duplicate job names are handled.
    pub fn conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sizing of the default [`BoundedExecutor`].
    pub fn backend(mut self, config: BackendConfig) -> Self {
        self.backend = config;
        self
    }

    /// Replace the default backend altogether.
    pub fn executor(mut self, executor: SharedExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Build the context.
    pub fn build(self) -> JobContext {
        let registry = Arc::new(Registry::new(self.policy));
        let backend = self
            .executor
            .unwrap_or_else(|| Arc::new(BoundedExecutor::new(self.backend)));
        JobContext {
            inner: Arc::new(ContextInner {
                resolver: Resolver::new(registry.clone()),
                registry,
                backend,
            }),
        }
    }
}
