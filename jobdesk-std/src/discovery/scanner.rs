//! The scan itself: enumerate, load, filter, register.

use super::{
    catalog::{Catalog, TypeMetadata},
    enumerate::{EnumerateError, Enumerator},
    filter::ScanFilter,
};
use crate::{registry::Registry, verbose::verbose};
use jobdesk_core::{JobError, JobResult};
use std::{fmt, sync::Arc};

/// Walks namespaces and registers the capabilities of accepted types.
#[derive(Clone)]
pub struct Scanner {
    enumerator: Arc<dyn Enumerator>,
    catalog: Arc<dyn Catalog>,
    filter: ScanFilter,
}

impl Scanner {
    /// Create a scanner.
    pub fn new(enumerator: Arc<dyn Enumerator>, catalog: Arc<dyn Catalog>, filter: ScanFilter) -> Self {
        Self {
            enumerator,
            catalog,
            filter,
        }
    }

    /// Metadata of the types under `namespace` that the filter accepts.
    ///
    /// A namespace that names a type known to the catalog is that type.
    /// Unknown namespaces and unloadable candidates are skipped with a
    /// warning; enumeration I/O failures are `FindersTrouble`.
    pub fn find(&self, namespace: &str) -> JobResult<Vec<TypeMetadata>> {
        let candidates = if self.catalog.contains(namespace) {
            vec![namespace.to_owned()]
        } else {
            match self.enumerator.enumerate(namespace) {
                Ok(candidates) => candidates,
                Err(err @ EnumerateError::NotFound(_)) => {
                    tracing::warn!(namespace, error = %err, "namespace skipped");
                    return Ok(Vec::new());
                }
                Err(err) => {
                    return Err(JobError::finders_trouble(format!(
                        "could not enumerate namespace `{namespace}`"
                    ))
                    .with_cause(err));
                }
            }
        };

        let mut accepted = Vec::new();
        for candidate in candidates {
            let Some(metadata) = self.catalog.load(&candidate) else {
                tracing::warn!(namespace, candidate = %candidate, "candidate type could not be loaded");
                continue;
            };
            if self.filter.accepts(&metadata) {
                verbose!(namespace, candidate = %candidate, "candidate accepted");
                accepted.push(metadata);
            } else {
                verbose!(namespace, candidate = %candidate, "candidate filtered out");
            }
        }
        Ok(accepted)
    }

    /// Scan every namespace and register what was found in `registry`.
    ///
    /// Returns the accepted provider identifiers in discovery order and
    /// records them in the registry. Providers recorded by an earlier scan
    /// are reported again but not registered twice. Registration is all or
    /// nothing: a strict conflict leaves the registry as it was.
    pub fn scan<S: AsRef<str>>(&self, namespaces: &[S], registry: &Registry) -> JobResult<Vec<String>> {
        let known = registry.providers();
        let mut providers: Vec<String> = Vec::new();
        let mut descriptors = Vec::new();
        for namespace in namespaces {
            for metadata in self.find(namespace.as_ref())? {
                let provider = metadata.type_name().to_owned();
                if providers.contains(&provider) {
                    continue;
                }
                if !known.contains(&provider) {
                    descriptors.extend(
                        metadata
                            .methods()
                            .iter()
                            .filter_map(|method| method.descriptor(&provider))
                            .map(Arc::new),
                    );
                }
                providers.push(provider);
            }
        }
        registry.register_all(descriptors)?;
        registry.record_providers(providers.iter().cloned());
        Ok(providers)
    }
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}
