//! # jobdesk - Name-Based Job Dispatch
//!
//! `jobdesk` decouples callers from implementations. A caller declares a
//! *job offer*: a trait whose methods name jobs. A library provides
//! *workers*: types whose methods are bound to the same job names. Discovery
//! finds the workers, and a dispatcher turns each offer method call into a
//! call object that can run synchronously, run in the background with a
//! callback, or be canceled first.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jobdesk::prelude::*;
//!
//! // Provider side
//! #[derive(Default)]
//! pub struct StoneWorker;
//!
//! #[worker]
//! impl StoneWorker {
//!     #[job("pickup_stones")]
//!     pub fn pickup(&self, color: String, count: i32) -> bool {
//!         color == "red" && count > 0
//!     }
//! }
//!
//! // Caller side
//! #[job_offer(namespaces = ["my_app::workers"])]
//! pub trait StoneOffer {
//!     #[job("pickup_stones")]
//!     fn pickup_stones(&self, color: String, count: i32) -> Result<CallHandle<bool>, JobError>;
//! }
//!
//! let context = JobContext::new();
//! Discovery::new(&context).offer::<StoneOfferClient>().entry().execute();
//!
//! let client = StoneOfferClient::new(Dispatcher::builder(&context).build());
//! let outcome = client.pickup_stones("red".into(), 3)?.execute();
//! assert_eq!(outcome.into_value(), Some(true));
//! ```
//!
//! ## Errors
//!
//! Every failure is a [`JobError`] classified by [`ErrorKind`]. Contract
//! violations (`Fatal`) are returned from the offer method itself; anything
//! that goes wrong while a worker runs is reported in the [`Outcome`].

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use jobdesk_core::{
    // Arguments
    Arg,
    // Errors
    BoxError,
    // Calls
    Call,
    CallHandle,
    Callback,
    CancelFlag,
    ErrorKind,
    // Execution
    Executor,
    FnCallback,
    FromCall,
    JobArgs,
    JobError,
    // Declarations
    JobMethod,
    JobMethodKey,
    JobOffer,
    JobResult,
    JobValue,
    // Envelope
    Outcome,
    OutcomeBuilder,
    RawCall,
    SharedExecutor,
    // Type descriptors
    Signature,
    Status,
    Task,
    TypeShape,
    TypeTag,
    callback,
    describe_call,
    downcast_value,
    job_args,
};

pub use jobdesk_std::{
    adapter::{
        AdapterFactory, CallAdapter, CallAdapterFactory, OutcomeAdapterFactory,
        ShapeAdapterFactory,
    },
    backend::{BackendConfig, BoundedExecutor, InlineExecutor},
    call_ext::{CallExt, OutcomeFuture},
    context::{JobContext, JobContextBuilder},
    discovery::{Discovery, DiscoveryCall},
    dispatcher::{Dispatcher, DispatcherBuilder},
    is_verbose,
    registry::{CapabilityDescriptor, ConflictPolicy, Registry},
    resolver::{BoundJob, Resolver},
    set_verbose,
};

/// Adapter layer.
pub mod adapter {
    #![allow(clippy::wildcard_imports)]
    pub use jobdesk_std::adapter::*;
}

/// Discovery: enumerators, catalogs, filters and the build-time manifest.
pub mod discovery {
    #![allow(clippy::wildcard_imports)]
    pub use jobdesk_std::discovery::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use jobdesk_std::testing::*;
}

/// Prelude module - common imports for jobdesk.
///
/// # Usage
///
/// ```rust,ignore
/// use jobdesk::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Call, CallExt, CallHandle, Callback, Discovery, Dispatcher, ErrorKind, JobContext,
        JobError, JobOffer, JobResult, Outcome, Status, callback,
    };

    #[cfg(feature = "macros")]
    pub use crate::{job_offer, worker};
}

#[cfg(feature = "macros")]
pub use jobdesk_macros::{job_offer, worker};

pub use inventory;
