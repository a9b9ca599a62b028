//! Attribute macros for jobdesk.
//!
//! - `#[job_offer]` on a trait generates a client that dispatches every
//!   method to a named job
//! - `#[worker]` on an inherent impl block registers its `#[job]` methods in
//!   the build-time manifest
//!
//! Generated code refers to the `jobdesk` facade crate by absolute path.

use proc_macro::TokenStream;

mod job_attr;
mod job_offer;
mod worker;

/// Declare a job offer.
///
/// ```rust,ignore
/// #[job_offer(namespaces = ["sdk_b"])]
/// pub trait StoneOffer {
///     #[job("pickup_stones")]
///     fn pickup_stones(&self, color: String, count: i32) -> Result<CallHandle<bool>, JobError>;
/// }
///
/// let client = StoneOfferClient::new(dispatcher);
/// ```
///
/// Arguments:
/// - `namespaces = [..]`: at least one namespace the workers live in
/// - `client = Name`: name of the generated client, `<Trait>Client` by
///   default
#[proc_macro_attribute]
pub fn job_offer(attr: TokenStream, item: TokenStream) -> TokenStream {
    job_offer::job_offer_impl(attr, item)
}

/// Register the `#[job("name")]` methods of an impl block as workers.
///
/// The type must implement `Default`; every invocation runs on a fresh
/// instance.
#[proc_macro_attribute]
pub fn worker(attr: TokenStream, item: TokenStream) -> TokenStream {
    worker::worker_impl(attr, item)
}
