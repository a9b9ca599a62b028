//! Shared fixtures: a worker library, the offers that call it, and a
//! library-defined call shape.
#![allow(dead_code)]

use jobdesk::{
    Call, CallHandle, Callback, Discovery, Dispatcher, FromCall, JobContext, JobError, JobResult,
    Outcome, RawCall, ShapeAdapterFactory, job_offer,
};

pub mod sdk_b {
    use jobdesk::worker;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Module path the `#[worker]` registrations below are recorded under.
    pub const MODULE: &str = module_path!();

    #[derive(Debug, thiserror::Error)]
    pub enum StoneError {
        #[error("cannot weigh {0} stones")]
        Negative(i32),
    }

    #[derive(Default)]
    pub struct StoneWorker;

    #[worker]
    impl StoneWorker {
        #[job("pickup_stones")]
        pub fn pickup(&self, color: String, count: i32) -> bool {
            color == "red" && count > 0
        }

        #[job("weigh_stones")]
        pub fn weigh(&self, count: i32) -> Result<u32, StoneError> {
            u32::try_from(count)
                .map(|count| count * 7)
                .map_err(|_| StoneError::Negative(count))
        }

        pub fn not_a_job(&self) -> u8 {
            0
        }
    }

    pub static TALLIES: AtomicUsize = AtomicUsize::new(0);

    #[derive(Default)]
    pub struct TallyWorker;

    #[worker]
    impl TallyWorker {
        #[job("tally")]
        pub fn tally() -> usize {
            TALLIES.fetch_add(1, Ordering::SeqCst) + 1
        }
    }
}

pub mod sdk_dup {
    use jobdesk::worker;

    #[derive(Default)]
    pub struct Impostor;

    #[worker]
    impl Impostor {
        #[job("pickup_stones")]
        pub fn grab(&self, _color: String, _count: i32) -> bool {
            false
        }
    }
}

#[job_offer(namespaces = ["sdk_b"])]
pub trait StoneOffer {
    #[job("pickup_stones")]
    fn pickup_stones(&self, color: String, count: i32) -> Result<CallHandle<bool>, JobError>;

    #[job("collect_stones")]
    fn collect_stones(&self, color: String) -> Result<CallHandle<bool>, JobError>;

    #[job("weigh_stones")]
    fn weigh_stones(&self, count: i32) -> Result<Outcome<u32>, JobError>;

    #[job("tally")]
    fn tally(&self) -> Result<CallHandle<usize>, JobError>;
}

#[job_offer(namespaces = ["sdk_b"], client = ClumsyClient)]
pub trait ClumsyOffer {
    #[job("pickup_stones")]
    fn pickup_stones(&self, color: String) -> Result<CallHandle<bool>, JobError>;
}

#[job_offer(namespaces = ["sdk_b"])]
pub trait FancyOffer {
    #[job("pickup_stones")]
    fn pickup_stones(&self, color: String, count: i32) -> Result<WorkerCall<bool>, JobError>;
}

/// A call shape defined outside jobdesk.
pub struct WorkerCall<T> {
    inner: CallHandle<T>,
}

impl<T: Send + 'static> WorkerCall<T> {
    pub fn run(&self) -> Outcome<T> {
        self.inner.execute()
    }

    pub fn submit(&self, callback: Box<dyn Callback<T>>) -> JobResult<()> {
        self.inner.enqueue(callback)
    }

    pub fn abort(&self) {
        self.inner.cancel();
    }
}

impl<T: Send + 'static> FromCall for WorkerCall<T> {
    fn from_call(call: RawCall) -> JobResult<Self> {
        Ok(WorkerCall {
            inner: CallHandle::new(call),
        })
    }
}

/// Adapter factory for [`WorkerCall`].
pub fn worker_call_factory() -> ShapeAdapterFactory {
    ShapeAdapterFactory::new("WorkerCall")
}

/// A fresh context with the `sdk_b` workers discovered.
pub fn discovered_context() -> JobContext {
    let context = JobContext::new();
    let outcome = Discovery::new(&context)
        .offer::<StoneOfferClient>()
        .entry()
        .execute();
    assert!(outcome.is_complete(), "discovery failed: {:?}", outcome.error());
    context
}

/// A stone client over `context`.
pub fn stone_client(context: &JobContext) -> StoneOfferClient {
    StoneOfferClient::new(Dispatcher::builder(context).build())
}

/// Write a zip archive holding empty `entries`.
pub fn write_archive(path: &std::path::Path, entries: &[&str]) {
    let mut writer = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    let options =
        zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for entry in entries {
        writer.start_file(*entry, options).unwrap();
    }
    writer.finish().unwrap();
}
