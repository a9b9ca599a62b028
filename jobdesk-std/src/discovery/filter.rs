//! Acceptance rules for candidate provider types.

use super::catalog::{JOB_ATTRIBUTE, TypeMetadata, WORKER_ATTRIBUTE};
use std::{fmt, sync::Arc};

type Predicate = Arc<dyn Fn(&TypeMetadata) -> bool + Send + Sync>;

/// Decides which candidate types a scan accepts.
///
/// An attribute counts when its name matches one of the filter names
/// (exactly or ignoring ASCII case) and its rendering contains every filter
/// string. The type is accepted when the count reaches the number of filter
/// names, or is at least one when only strings are given, and the custom
/// predicate, if any, agrees.
///
/// The default filter names `worker` and `job`, so it accepts a type with
/// at least two such attributes in total. A `#[worker]` type with one job
/// method qualifies; so does any type carrying two `job` attributes, since
/// attributes are counted, not names.
#[derive(Clone)]
pub struct ScanFilter {
    names: Vec<String>,
    strings: Vec<String>,
    predicate: Option<Predicate>,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self::by_attributes([WORKER_ATTRIBUTE, JOB_ATTRIBUTE])
    }
}

impl ScanFilter {
    /// A filter accepting every type.
    pub fn accept_all() -> Self {
        Self {
            names: Vec::new(),
            strings: Vec::new(),
            predicate: None,
        }
    }

    /// Filter by attribute names.
    pub fn by_attributes<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            ..Self::accept_all()
        }
    }

    /// Also require every counted attribute to contain these strings. Empty
    /// strings are ignored.
    pub fn containing<I>(mut self, strings: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.strings.extend(
            strings
                .into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty()),
        );
        self
    }

    /// Also require `predicate` to accept the type.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&TypeMetadata) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// `true` when no rule is configured.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.strings.is_empty() && self.predicate.is_none()
    }

    /// Whether `metadata` passes.
    pub fn accepts(&self, metadata: &TypeMetadata) -> bool {
        if let Some(predicate) = &self.predicate {
            if !predicate(metadata) {
                return false;
            }
        }
        if self.names.is_empty() && self.strings.is_empty() {
            return true;
        }

        let matched = metadata
            .all_attributes()
            .filter(|attribute| {
                self.names.is_empty() || self.names.iter().any(|name| attribute.is_named(name))
            })
            .filter(|attribute| {
                let rendered = attribute.to_string();
                self.strings.iter().all(|s| rendered.contains(s.as_str()))
            })
            .count();

        matched >= self.names.len().max(1)
    }
}

impl fmt::Debug for ScanFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanFilter")
            .field("names", &self.names)
            .field("strings", &self.strings)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::catalog::{Attribute, MethodMetadata};
    use jobdesk_core::{Signature, TypeShape};

    fn stone_worker() -> TypeMetadata {
        TypeMetadata::new("sdk_b::StoneWorker")
            .attribute(Attribute::new("Worker", ""))
            .method(
                MethodMetadata::new("pickup", Signature::new(vec![], TypeShape::of::<bool>()))
                    .attribute(Attribute::new("job", "pickup_stones")),
            )
    }

    #[test]
    fn default_filter_needs_worker_and_job() {
        let filter = ScanFilter::default();
        assert!(filter.accepts(&stone_worker()));

        let bare = TypeMetadata::new("sdk_b::Helper").attribute(Attribute::new("worker", ""));
        assert!(!filter.accepts(&bare));
    }

    #[test]
    fn attributes_are_counted_not_names() {
        let job = |name: &str| {
            MethodMetadata::new(name, Signature::new(vec![], TypeShape::of::<bool>()))
                .attribute(Attribute::new("job", "pickup_stones"))
        };
        let two_jobs = TypeMetadata::new("sdk_b::Loose")
            .method(job("pickup"))
            .method(job("carry"));
        assert!(ScanFilter::default().accepts(&two_jobs));

        let one_job = TypeMetadata::new("sdk_b::Single").method(job("pickup"));
        assert!(!ScanFilter::default().accepts(&one_job));
    }

    #[test]
    fn strings_narrow_counted_attributes() {
        let filter = ScanFilter::by_attributes(["job"]).containing(["pickup"]);
        assert!(filter.accepts(&stone_worker()));

        let filter = ScanFilter::by_attributes(["job"]).containing(["collect", ""]);
        assert!(!filter.accepts(&stone_worker()));

        let strings_only = ScanFilter::accept_all().containing(["stones"]);
        assert!(strings_only.accepts(&stone_worker()));
    }

    #[test]
    fn predicate_can_veto() {
        let filter = ScanFilter::default().with_predicate(|meta| meta.type_name().starts_with("sdk_a"));
        assert!(!filter.accepts(&stone_worker()));
        assert!(ScanFilter::accept_all().accepts(&TypeMetadata::new("anything")));
    }
}
