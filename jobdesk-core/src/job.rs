//! Caller-side job declarations.

use crate::signature::{TypeShape, describe_call};
use std::fmt;

/// Marker implemented by every generated job-offer client.
///
/// A job offer is a trait whose methods each name a job; the client
/// generated for it forwards every method to a dispatcher. The namespaces are
/// where discovery looks for the providers of those jobs.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a job offer",
    label = "not a job offer",
    note = "Annotate the trait with `#[job_offer(namespaces = [..])]` and use the generated client."
)]
pub trait JobOffer {
    /// Full path of the declaring trait, `module::path::Trait`.
    const OFFER: &'static str;

    /// Namespaces to scan for providers.
    const NAMESPACES: &'static [&'static str];
}

/// Identity of a declared method: declaring offer plus method name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct JobMethodKey {
    offer: &'static str,
    name: &'static str,
}

impl JobMethodKey {
    /// Create a key.
    pub const fn new(offer: &'static str, name: &'static str) -> Self {
        Self { offer, name }
    }

    /// The declaring offer.
    pub fn offer(&self) -> &'static str {
        self.offer
    }

    /// The method name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for JobMethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.offer, self.name)
    }
}

/// A caller-declared job method.
///
/// Generated by `#[job_offer]`; can also be written by hand:
///
/// ```rust
/// use jobdesk_core::{JobMethod, TypeShape};
///
/// let method = JobMethod::new("StoneOffer", "pickup_stones")
///     .job_name("pickup_stones")
///     .namespaces(&["sdk_b"])
///     .param(TypeShape::of::<String>())
///     .param(TypeShape::of::<i32>())
///     .returns(TypeShape::parameterized("CallHandle", vec![TypeShape::of::<bool>()]));
/// assert_eq!(method.key().to_string(), "StoneOffer::pickup_stones");
/// ```
#[derive(Clone, Debug)]
pub struct JobMethod {
    key: JobMethodKey,
    job_name: Option<&'static str>,
    namespaces: &'static [&'static str],
    params: Vec<TypeShape>,
    returns: TypeShape,
}

impl JobMethod {
    /// Start a declaration with no job name, no parameters and a wildcard
    /// return shape.
    pub fn new(offer: &'static str, name: &'static str) -> Self {
        Self {
            key: JobMethodKey::new(offer, name),
            job_name: None,
            namespaces: &[],
            params: Vec::new(),
            returns: TypeShape::Wildcard,
        }
    }

    /// Bind the method to a job name.
    pub fn job_name(mut self, job_name: &'static str) -> Self {
        self.job_name = Some(job_name);
        self
    }

    /// Set the namespaces of the declaring offer.
    pub fn namespaces(mut self, namespaces: &'static [&'static str]) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Append a parameter shape.
    pub fn param(mut self, shape: TypeShape) -> Self {
        self.params.push(shape);
        self
    }

    /// Set the declared return shape.
    pub fn returns(mut self, shape: TypeShape) -> Self {
        self.returns = shape;
        self
    }

    /// The identity of this method.
    pub fn key(&self) -> JobMethodKey {
        self.key
    }

    /// The bound job name, if any.
    pub fn bound_job_name(&self) -> Option<&'static str> {
        self.job_name
    }

    /// Namespaces of the declaring offer.
    pub fn offer_namespaces(&self) -> &'static [&'static str] {
        self.namespaces
    }

    /// Parameter shapes in order.
    pub fn params(&self) -> &[TypeShape] {
        &self.params
    }

    /// Declared return shape.
    pub fn return_shape(&self) -> &TypeShape {
        &self.returns
    }

    /// `Offer::method(params..)` for diagnostics.
    pub fn describe(&self) -> String {
        describe_call(&self.key.to_string(), &self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_prints_offer_method_and_params() {
        let method = JobMethod::new("StoneOffer", "pickup_stones")
            .param(TypeShape::of::<i32>())
            .param(TypeShape::of::<bool>());
        assert_eq!(method.describe(), "StoneOffer::pickup_stones(i32, bool)");
        assert_eq!(method.bound_job_name(), None);
    }

    #[test]
    fn keys_ignore_everything_but_identity() {
        let a = JobMethod::new("StoneOffer", "pickup_stones").job_name("a");
        let b = JobMethod::new("StoneOffer", "pickup_stones").job_name("b");
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), JobMethod::new("Other", "pickup_stones").key());
    }
}
