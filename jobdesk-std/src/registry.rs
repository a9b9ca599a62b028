//! Capability registry: job name to worker bindings and the resolved job
//! cache.

use crate::{resolver::BoundJob, verbose::verbose};
use jobdesk_core::{BoxError, JobArgs, JobError, JobMethodKey, JobResult, JobValue, Signature};
use std::{
    collections::{
        HashMap,
        hash_map::{Entry, VacantEntry},
    },
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

/// The invocation half of a capability: calls the worker with the arguments.
pub type Invoker = Arc<dyn Fn(&JobArgs) -> Result<JobValue, BoxError> + Send + Sync>;

/// An implementation bound to a job name.
///
/// Built by discovery from `#[worker]` registrations, or by hand from any
/// closure:
///
/// ```rust
/// use jobdesk_core::{JobArgs, Signature, TypeShape};
/// use jobdesk_std::registry::CapabilityDescriptor;
///
/// let descriptor = CapabilityDescriptor::new(
///     "pickup_stones",
///     "sdk_b::StoneWorker",
///     "pickup",
///     Signature::new(
///         vec![TypeShape::of::<String>(), TypeShape::of::<i32>()],
///         TypeShape::of::<bool>(),
///     ),
///     |args: &JobArgs| {
///         let count: i32 = args.get(1)?;
///         Ok(Box::new(count > 0))
///     },
/// );
/// assert_eq!(descriptor.job_name(), "pickup_stones");
/// ```
#[derive(Clone)]
pub struct CapabilityDescriptor {
    job_name: String,
    provider: String,
    method: String,
    signature: Signature,
    invoker: Invoker,
}

impl CapabilityDescriptor {
    /// Create a descriptor.
    pub fn new<F>(
        job_name: impl Into<String>,
        provider: impl Into<String>,
        method: impl Into<String>,
        signature: Signature,
        invoker: F,
    ) -> Self
    where
        F: Fn(&JobArgs) -> Result<JobValue, BoxError> + Send + Sync + 'static,
    {
        Self::from_invoker(job_name, provider, method, signature, Arc::new(invoker))
    }

    /// Create a descriptor from an already shared invoker.
    pub fn from_invoker(
        job_name: impl Into<String>,
        provider: impl Into<String>,
        method: impl Into<String>,
        signature: Signature,
        invoker: Invoker,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            provider: provider.into(),
            method: method.into(),
            signature,
            invoker,
        }
    }

    /// The job name this capability answers to.
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Identifier of the providing type.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Name of the providing method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The method's signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Call the worker.
    pub fn invoke(&self, args: &JobArgs) -> Result<JobValue, BoxError> {
        (self.invoker)(args)
    }
}

impl fmt::Debug for CapabilityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("job_name", &self.job_name)
            .field("provider", &self.provider)
            .field("method", &self.method)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// What happens when a job name is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Refuse the second binding with a `Fatal` error.
    #[default]
    Strict,
    /// Log a warning and keep the first binding.
    Lenient,
}

/// Thread-safe store of capability bindings and resolved jobs.
///
/// Bindings are never overwritten: the first registration for a name wins
/// until [`flush`](Registry::flush).
#[derive(Default)]
pub struct Registry {
    policy: ConflictPolicy,
    capabilities: RwLock<HashMap<String, Arc<CapabilityDescriptor>>>,
    resolved: RwLock<HashMap<JobMethodKey, Arc<BoundJob>>>,
    providers: RwLock<Vec<String>>,
}

impl Registry {
    /// Create an empty registry with the given conflict policy.
    pub fn new(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// The conflict policy.
    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Bind `name` to `descriptor`.
    ///
    /// Returns `Ok(true)` when the binding was stored, `Ok(false)` when a
    /// lenient registry kept an existing binding, and a `Fatal` error when a
    /// strict registry refused it.
    pub fn register(
        &self,
        name: impl Into<String>,
        descriptor: impl Into<Arc<CapabilityDescriptor>>,
    ) -> JobResult<bool> {
        let name = name.into();
        let descriptor = descriptor.into();
        let mut capabilities = self
            .capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match capabilities.entry(name) {
            Entry::Occupied(existing) => {
                let message = duplicate_message(existing.key(), existing.get(), &descriptor);
                match self.policy {
                    ConflictPolicy::Strict => Err(JobError::fatal(message)),
                    ConflictPolicy::Lenient => {
                        tracing::warn!("{message}; keeping the first binding");
                        Ok(false)
                    }
                }
            }
            Entry::Vacant(slot) => {
                insert(slot, descriptor);
                Ok(true)
            }
        }
    }

    /// Bind every descriptor under its own job name, all or nothing.
    ///
    /// A strict registry checks the whole batch against the existing
    /// bindings and against itself first; on a conflict nothing is stored.
    /// A lenient registry keeps the first binding of each name. Returns the
    /// number of bindings stored.
    pub fn register_all<I>(&self, descriptors: I) -> JobResult<usize>
    where
        I: IntoIterator<Item = Arc<CapabilityDescriptor>>,
    {
        let descriptors: Vec<_> = descriptors.into_iter().collect();
        let mut capabilities = self
            .capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if self.policy == ConflictPolicy::Strict {
            let mut batch: HashMap<&str, &Arc<CapabilityDescriptor>> = HashMap::new();
            for descriptor in &descriptors {
                let name = descriptor.job_name();
                let bound = capabilities
                    .get(name)
                    .or_else(|| batch.get(name).copied());
                if let Some(bound) = bound {
                    return Err(JobError::fatal(duplicate_message(name, bound, descriptor)));
                }
                batch.insert(name, descriptor);
            }
        }

        let mut stored = 0;
        for descriptor in descriptors {
            match capabilities.entry(descriptor.job_name().to_owned()) {
                Entry::Occupied(existing) => {
                    let message = duplicate_message(existing.key(), existing.get(), &descriptor);
                    tracing::warn!("{message}; keeping the first binding");
                }
                Entry::Vacant(slot) => {
                    insert(slot, descriptor);
                    stored += 1;
                }
            }
        }
        Ok(stored)
    }

    /// The descriptor bound to `name`.
    pub fn lookup(&self, name: &str) -> Option<Arc<CapabilityDescriptor>> {
        self.capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Number of bound job names.
    pub fn len(&self) -> usize {
        self.capabilities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `true` if no job name is bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Memoize a resolved job. If another thread got there first, its job is
    /// kept and returned.
    pub fn cache_resolved_job(&self, key: JobMethodKey, job: Arc<BoundJob>) -> Arc<BoundJob> {
        self.resolved
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(job)
            .clone()
    }

    /// The memoized job for `key`.
    pub fn resolved_job(&self, key: &JobMethodKey) -> Option<Arc<BoundJob>> {
        self.resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Record provider identifiers accepted by discovery. Already recorded
    /// identifiers are skipped.
    pub fn record_providers<I>(&self, providers: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut recorded = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for provider in providers {
            let provider = provider.into();
            if !recorded.contains(&provider) {
                recorded.push(provider);
            }
        }
    }

    /// Provider identifiers recorded so far, in discovery order.
    pub fn providers(&self) -> Vec<String> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether discovery has recorded any provider.
    pub fn has_providers(&self) -> bool {
        !self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Drop every binding, resolved job and provider.
    pub fn flush(&self) {
        self.capabilities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.resolved
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("policy", &self.policy)
            .field("capabilities", &self.len())
            .field("providers", &self.providers())
            .finish_non_exhaustive()
    }
}

fn duplicate_message(
    name: &str,
    bound: &CapabilityDescriptor,
    other: &CapabilityDescriptor,
) -> String {
    format!(
        "job name `{name}` is duplicated: bound to {}::{}, also declared by {}::{}",
        bound.provider(),
        bound.method(),
        other.provider(),
        other.method()
    )
}

fn insert(
    slot: VacantEntry<'_, String, Arc<CapabilityDescriptor>>,
    descriptor: Arc<CapabilityDescriptor>,
) {
    verbose!(
        job = %slot.key(),
        provider = descriptor.provider(),
        method = descriptor.method(),
        "registered capability"
    );
    slot.insert(descriptor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobdesk_core::{ErrorKind, TypeShape};

    fn descriptor(provider: &str) -> Arc<CapabilityDescriptor> {
        Arc::new(CapabilityDescriptor::new(
            "pickup_stones",
            provider,
            "pickup",
            Signature::new(vec![], TypeShape::of::<bool>()),
            |_: &JobArgs| Ok(Box::new(true)),
        ))
    }

    #[test]
    fn lookup_returns_registered_descriptor() {
        let registry = Registry::default();
        let first = descriptor("sdk_b::StoneWorker");
        assert!(registry.register("pickup_stones", first.clone()).unwrap());

        let found = registry.lookup("pickup_stones").unwrap();
        assert!(Arc::ptr_eq(&found, &first));
        assert!(registry.contains("pickup_stones"));
        assert!(registry.lookup("collect_stones").is_none());
    }

    #[test]
    fn strict_duplicate_is_fatal_and_keeps_first() {
        let registry = Registry::new(ConflictPolicy::Strict);
        let first = descriptor("sdk_b::StoneWorker");
        registry.register("pickup_stones", first.clone()).unwrap();

        let err = registry
            .register("pickup_stones", descriptor("sdk_c::OtherWorker"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(err.message().contains("sdk_c::OtherWorker"));
        assert!(Arc::ptr_eq(&registry.lookup("pickup_stones").unwrap(), &first));
    }

    #[test]
    fn lenient_duplicate_keeps_first() {
        let registry = Registry::new(ConflictPolicy::Lenient);
        let first = descriptor("sdk_b::StoneWorker");
        registry.register("pickup_stones", first.clone()).unwrap();
        assert!(!registry.register("pickup_stones", descriptor("sdk_c::OtherWorker")).unwrap());
        assert!(Arc::ptr_eq(&registry.lookup("pickup_stones").unwrap(), &first));
    }

    fn named(job_name: &str, provider: &str) -> Arc<CapabilityDescriptor> {
        Arc::new(CapabilityDescriptor::new(
            job_name,
            provider,
            job_name,
            Signature::new(vec![], TypeShape::of::<bool>()),
            |_: &JobArgs| Ok(Box::new(true)),
        ))
    }

    #[test]
    fn strict_batch_with_a_conflict_stores_nothing() {
        let registry = Registry::new(ConflictPolicy::Strict);
        let err = registry
            .register_all([named("a1", "ns::A"), named("x", "ns::A"), named("x", "ns::B")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert!(err.message().contains("`x`"));
        assert!(registry.is_empty());

        assert_eq!(registry.register_all([named("a1", "ns::A"), named("x", "ns::A")]).unwrap(), 2);
        let err = registry.register_all([named("b1", "ns::B"), named("x", "ns::B")]).unwrap_err();
        assert!(err.message().contains("ns::A::x"));
        assert!(!registry.contains("b1"));
    }

    #[test]
    fn lenient_batch_keeps_first_bindings() {
        let registry = Registry::new(ConflictPolicy::Lenient);
        let stored = registry
            .register_all([named("x", "ns::A"), named("x", "ns::B"), named("y", "ns::B")])
            .unwrap();
        assert_eq!(stored, 2);
        assert_eq!(registry.lookup("x").unwrap().provider(), "ns::A");
    }

    #[test]
    fn providers_are_deduplicated_and_flushed() {
        let registry = Registry::default();
        registry.record_providers(["a::One", "b::Two"]);
        registry.record_providers(vec!["a::One".to_string()]);
        assert_eq!(registry.providers(), vec!["a::One", "b::Two"]);

        registry.register("pickup_stones", descriptor("a::One")).unwrap();
        registry.flush();
        assert!(!registry.has_providers());
        assert!(registry.is_empty());
    }
}
