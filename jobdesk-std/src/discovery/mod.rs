//! # Discovery
//!
//! Finds provider types under a set of namespaces and registers their
//! capabilities in a [`JobContext`]'s registry.
//!
//! The scan is itself a call: [`Discovery::entry`] returns a
//! [`DiscoveryCall`] that can be executed in place, enqueued with a
//! callback, canceled before it starts, or cloned. Its value is the list of
//! accepted provider identifiers.
//!
//! ```rust
//! use jobdesk_core::Call;
//! use jobdesk_std::{context::JobContext, discovery::Discovery};
//!
//! let context = JobContext::new();
//! let outcome = Discovery::new(&context).namespace("no_such_sdk").entry().execute();
//! assert!(outcome.is_complete());
//! assert_eq!(outcome.into_value(), Some(Vec::<String>::new()));
//! ```

mod catalog;
mod enumerate;
mod filter;
mod scanner;

pub use catalog::{
    Attribute, Catalog, FieldMetadata, InventoryCatalog, JOB_ATTRIBUTE, MethodMetadata,
    ProvidedMethod, ProviderRegistration, StaticCatalog, TypeMetadata, WORKER_ATTRIBUTE,
};
pub use enumerate::{
    ArchiveEnumerator, DEFAULT_SUFFIX, DirectoryEnumerator, EnumerateError, Enumerator,
    InventoryEnumerator, Source, SourceEnumerator, in_namespace,
};
pub use filter::ScanFilter;
pub use scanner::Scanner;

use crate::{context::JobContext, job_call::COMPLETE_MESSAGE, verbose::verbose};
use jobdesk_core::{
    Call, Callback, CancelFlag, JobError, JobOffer, JobResult, Outcome, SharedExecutor,
};
use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

/// Builder for a discovery run.
///
/// Defaults: the `#[worker]` manifest as both enumerator and catalog, the
/// default [`ScanFilter`], and the context's shared backend for `enqueue`.
pub struct Discovery {
    context: JobContext,
    namespaces: Vec<String>,
    enumerator: Arc<dyn Enumerator>,
    catalog: Arc<dyn Catalog>,
    filter: ScanFilter,
    executor: Option<SharedExecutor>,
}

impl Discovery {
    /// Start configuring a scan that registers into `context`.
    pub fn new(context: &JobContext) -> Self {
        Self {
            context: context.clone(),
            namespaces: Vec::new(),
            enumerator: Arc::new(InventoryEnumerator),
            catalog: Arc::new(InventoryCatalog),
            filter: ScanFilter::default(),
            executor: None,
        }
    }

    /// Scan the namespaces declared by a job offer.
    pub fn offer<C: JobOffer>(self) -> Self {
        self.namespaces(C::NAMESPACES.iter().copied())
    }

    /// Add a namespace.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if !self.namespaces.contains(&namespace) {
            self.namespaces.push(namespace);
        }
        self
    }

    /// Add several namespaces.
    pub fn namespaces<I>(self, namespaces: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        namespaces
            .into_iter()
            .fold(self, |discovery, namespace| discovery.namespace(namespace))
    }

    /// Replace the acceptance filter.
    pub fn filter(mut self, filter: ScanFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Replace the enumeration strategy.
    pub fn enumerator(mut self, enumerator: impl Enumerator + 'static) -> Self {
        self.enumerator = Arc::new(enumerator);
        self
    }

    /// Replace the catalog.
    pub fn catalog(mut self, catalog: impl Catalog + 'static) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// Run enqueued scans on `executor` instead of the shared backend.
    pub fn executor(mut self, executor: SharedExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Build the call.
    pub fn entry(self) -> DiscoveryCall {
        let executor = self
            .executor
            .unwrap_or_else(|| self.context.backend().clone());
        DiscoveryCall {
            run: Arc::new(ScanRun {
                context: self.context,
                namespaces: self.namespaces,
                scanner: Scanner::new(self.enumerator, self.catalog, self.filter),
            }),
            executor,
            canceled: CancelFlag::new(),
        }
    }
}

impl fmt::Debug for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Discovery")
            .field("namespaces", &self.namespaces)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

struct ScanRun {
    context: JobContext,
    namespaces: Vec<String>,
    scanner: Scanner,
}

impl ScanRun {
    fn run(&self, canceled: &CancelFlag) -> Outcome<Vec<String>> {
        if canceled.is_canceled() {
            return Outcome::canceled();
        }
        if self.namespaces.is_empty() {
            return Outcome::failed(JobError::fatal("discovery has no namespace to scan"));
        }
        verbose!(namespaces = ?self.namespaces, "discovery started");
        let scanned = catch_unwind(AssertUnwindSafe(|| {
            self.scanner
                .scan(&self.namespaces, self.context.registry())
        }));
        match scanned {
            Ok(Ok(providers)) => {
                verbose!(providers = ?providers, "discovery finished");
                Outcome::complete(providers, COMPLETE_MESSAGE)
            }
            Ok(Err(err)) => Outcome::failed(err),
            Err(_) => Outcome::failed(JobError::finders_trouble(format!(
                "discovery panicked while scanning {:?}",
                self.namespaces
            ))),
        }
    }
}

/// A discovery run as a call object.
pub struct DiscoveryCall {
    run: Arc<ScanRun>,
    executor: SharedExecutor,
    canceled: CancelFlag,
}

impl DiscoveryCall {
    /// The namespaces this call scans.
    pub fn namespaces(&self) -> &[String] {
        &self.run.namespaces
    }
}

impl Call<Vec<String>> for DiscoveryCall {
    fn execute(&self) -> Outcome<Vec<String>> {
        self.run.run(&self.canceled)
    }

    fn enqueue(&self, callback: Box<dyn Callback<Vec<String>>>) -> JobResult<()> {
        let run = self.run.clone();
        let canceled = self.canceled.clone();
        self.executor.execute(Box::new(move || {
            callback.deliver(run.run(&canceled));
        }))
    }

    fn cancel(&self) {
        self.canceled.cancel();
    }

    fn is_canceled(&self) -> bool {
        self.canceled.is_canceled()
    }

    fn clone_call(&self) -> Box<dyn Call<Vec<String>>> {
        Box::new(DiscoveryCall {
            run: self.run.clone(),
            executor: self.executor.clone(),
            canceled: CancelFlag::new(),
        })
    }
}

impl fmt::Debug for DiscoveryCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryCall")
            .field("namespaces", &self.run.namespaces)
            .field("canceled", &self.canceled.is_canceled())
            .finish()
    }
}
