//! Type metadata and the catalogs that load it.

use crate::registry::{CapabilityDescriptor, Invoker};
use jobdesk_core::{BoxError, JobArgs, JobValue, Signature};
use std::{collections::HashMap, fmt, sync::Arc};

/// A declared attribute such as `worker` or `job("pickup_stones")`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribute {
    /// Attribute name.
    pub name: &'static str,
    /// Attribute argument, empty when there is none.
    pub value: &'static str,
}

impl Attribute {
    /// Create an attribute.
    pub const fn new(name: &'static str, value: &'static str) -> Self {
        Self { name, value }
    }

    /// Exact or case-insensitive name match.
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.name.eq_ignore_ascii_case(name)
    }
}

/// Renders as `name` or `name("value")`.
impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            f.write_str(self.name)
        } else {
            write!(f, "{}({:?})", self.name, self.value)
        }
    }
}

/// Name of the attribute marking a provider type.
pub const WORKER_ATTRIBUTE: &str = "worker";

/// Name of the attribute binding a method to a job name.
pub const JOB_ATTRIBUTE: &str = "job";

/// Metadata of one field.
#[derive(Debug, Clone)]
pub struct FieldMetadata {
    /// Field name.
    pub name: String,
    /// Field attributes.
    pub attributes: Vec<Attribute>,
}

/// Metadata of one method, with its invoker when the method provides a job.
#[derive(Clone)]
pub struct MethodMetadata {
    name: String,
    job_name: Option<String>,
    attributes: Vec<Attribute>,
    signature: Signature,
    invoker: Option<Invoker>,
}

impl MethodMetadata {
    /// A method without job metadata.
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            job_name: None,
            attributes: Vec::new(),
            signature,
            invoker: None,
        }
    }

    /// Bind the method to `job_name` and attach the invoker.
    pub fn job<F>(mut self, job_name: impl Into<String>, invoker: F) -> Self
    where
        F: Fn(&JobArgs) -> Result<JobValue, BoxError> + Send + Sync + 'static,
    {
        self.job_name = Some(job_name.into());
        self.invoker = Some(Arc::new(invoker));
        self
    }

    /// Add an attribute.
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The job this method provides.
    pub fn job_name(&self) -> Option<&str> {
        self.job_name.as_deref()
    }

    /// Method attributes.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Method signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// A capability descriptor for this method, if it provides a job.
    pub fn descriptor(&self, provider: &str) -> Option<CapabilityDescriptor> {
        let job_name = self.job_name.as_ref()?;
        let invoker = self.invoker.clone()?;
        Some(CapabilityDescriptor::from_invoker(
            job_name.clone(),
            provider,
            self.name.clone(),
            self.signature.clone(),
            invoker,
        ))
    }
}

impl fmt::Debug for MethodMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMetadata")
            .field("name", &self.name)
            .field("job_name", &self.job_name)
            .field("attributes", &self.attributes)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Everything a scan filter can see about a candidate type.
#[derive(Debug, Clone)]
pub struct TypeMetadata {
    type_name: String,
    attributes: Vec<Attribute>,
    fields: Vec<FieldMetadata>,
    methods: Vec<MethodMetadata>,
}

impl TypeMetadata {
    /// Metadata for `type_name` with nothing declared.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attributes: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Add a type attribute.
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        self.fields.push(FieldMetadata {
            name: name.into(),
            attributes,
        });
        self
    }

    /// Add a method.
    pub fn method(mut self, method: MethodMetadata) -> Self {
        self.methods.push(method);
        self
    }

    /// The full type identifier.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Type attributes.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Fields.
    pub fn fields(&self) -> &[FieldMetadata] {
        &self.fields
    }

    /// Methods.
    pub fn methods(&self) -> &[MethodMetadata] {
        &self.methods
    }

    /// Type, field and method attributes, in that order.
    pub fn all_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes
            .iter()
            .chain(self.fields.iter().flat_map(|field| field.attributes.iter()))
            .chain(self.methods.iter().flat_map(|method| method.attributes.iter()))
    }
}

/// Loads the metadata of a type by its identifier.
pub trait Catalog: Send + Sync {
    /// Metadata for `type_name`, or `None` if this catalog cannot load it.
    fn load(&self, type_name: &str) -> Option<TypeMetadata>;

    /// Whether `type_name` is known.
    fn contains(&self, type_name: &str) -> bool {
        self.load(type_name).is_some()
    }
}

// ============================================================================
// Build-time manifest
// ============================================================================

/// A provider type registered at build time by `#[worker]`.
///
/// All fields are plain data so the registration can be built in a static
/// initializer.
#[derive(Debug)]
pub struct ProviderRegistration {
    /// Full type identifier, `module::path::Type`.
    pub type_name: &'static str,
    /// Type attributes.
    pub attributes: &'static [Attribute],
    /// Job-providing methods.
    pub methods: &'static [ProvidedMethod],
}

/// A job-providing method of a [`ProviderRegistration`].
pub struct ProvidedMethod {
    /// Method name.
    pub name: &'static str,
    /// The job name.
    pub job_name: &'static str,
    /// Method attributes.
    pub attributes: &'static [Attribute],
    /// Builds the method signature.
    pub signature: fn() -> Signature,
    /// Calls the method on a fresh instance of the provider.
    pub invoke: fn(&JobArgs) -> Result<JobValue, BoxError>,
}

impl fmt::Debug for ProvidedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvidedMethod")
            .field("name", &self.name)
            .field("job_name", &self.job_name)
            .finish_non_exhaustive()
    }
}

inventory::collect!(ProviderRegistration);

impl ProviderRegistration {
    /// Every registration linked into the binary.
    pub fn all() -> impl Iterator<Item = &'static ProviderRegistration> {
        inventory::iter::<ProviderRegistration>.into_iter()
    }

    /// Convert to owned metadata.
    pub fn metadata(&self) -> TypeMetadata {
        let mut metadata = TypeMetadata::new(self.type_name);
        metadata.attributes.extend_from_slice(self.attributes);
        for provided in self.methods {
            let mut method = MethodMetadata::new(provided.name, (provided.signature)())
                .job(provided.job_name, provided.invoke);
            method.attributes.extend_from_slice(provided.attributes);
            metadata.methods.push(method);
        }
        metadata
    }
}

/// Catalog over the `#[worker]` registrations linked into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryCatalog;

impl Catalog for InventoryCatalog {
    fn load(&self, type_name: &str) -> Option<TypeMetadata> {
        ProviderRegistration::all()
            .find(|registration| registration.type_name == type_name)
            .map(ProviderRegistration::metadata)
    }
}

/// Catalog over hand-built metadata.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    types: HashMap<String, TypeMetadata>,
}

impl StaticCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type.
    pub fn with(mut self, metadata: TypeMetadata) -> Self {
        self.insert(metadata);
        self
    }

    /// Add a type in place.
    pub fn insert(&mut self, metadata: TypeMetadata) {
        self.types.insert(metadata.type_name.clone(), metadata);
    }

    /// Identifiers of every known type.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl Catalog for StaticCatalog {
    fn load(&self, type_name: &str) -> Option<TypeMetadata> {
        self.types.get(type_name).cloned()
    }

    fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobdesk_core::TypeShape;

    #[test]
    fn attribute_names_match_case_insensitively() {
        let attribute = Attribute::new("Worker", "");
        assert!(attribute.is_named("worker"));
        assert!(attribute.is_named("Worker"));
        assert!(!attribute.is_named("job"));
        assert_eq!(Attribute::new("job", "pickup_stones").to_string(), "job(\"pickup_stones\")");
    }

    #[test]
    fn all_attributes_cover_type_fields_and_methods() {
        let metadata = TypeMetadata::new("sdk_b::StoneWorker")
            .attribute(Attribute::new(WORKER_ATTRIBUTE, ""))
            .field("bag", vec![Attribute::new("serde", "skip")])
            .method(
                MethodMetadata::new("pickup", Signature::new(vec![], TypeShape::of::<bool>()))
                    .attribute(Attribute::new(JOB_ATTRIBUTE, "pickup_stones")),
            );
        let names: Vec<_> = metadata.all_attributes().map(|a| a.name).collect();
        assert_eq!(names, vec!["worker", "serde", "job"]);
    }

    #[test]
    fn descriptor_requires_job_and_invoker() {
        let plain = MethodMetadata::new("helper", Signature::new(vec![], TypeShape::of::<()>()));
        assert!(plain.descriptor("sdk_b::StoneWorker").is_none());

        let job = MethodMetadata::new("pickup", Signature::new(vec![], TypeShape::of::<bool>()))
            .job("pickup_stones", |_: &JobArgs| Ok(Box::new(true)));
        let descriptor = job.descriptor("sdk_b::StoneWorker").unwrap();
        assert_eq!(descriptor.job_name(), "pickup_stones");
        assert_eq!(descriptor.provider(), "sdk_b::StoneWorker");
    }

    #[test]
    fn static_catalog_loads_by_identifier() {
        let catalog = StaticCatalog::new().with(TypeMetadata::new("sdk_b::StoneWorker"));
        assert!(catalog.contains("sdk_b::StoneWorker"));
        assert!(catalog.load("sdk_b::Missing").is_none());
        assert!(InventoryCatalog.load("sdk_b::Missing").is_none());
    }
}
