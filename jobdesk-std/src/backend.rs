//! Execution backends for enqueued calls.
//!
//! [`BoundedExecutor`] is the shared default: a small thread pool that hands
//! work to idle workers, grows up to a fixed number of threads, optionally
//! queues a bounded number of tasks and rejects the rest. With the default
//! [`BackendConfig`] it runs one task at a time and refuses a submission
//! while that task is running.

use jobdesk_core::{Executor, JobError, JobResult, Task};
use std::{
    collections::VecDeque,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread,
    time::Duration,
};

/// Sizing of a [`BoundedExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendConfig {
    /// Upper bound on live worker threads.
    pub max_workers: usize,
    /// Tasks that may wait when no worker is free.
    pub queue_capacity: usize,
    /// How long an idle worker lingers before exiting.
    pub keep_alive: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            max_workers: 1,
            queue_capacity: 0,
            keep_alive: Duration::from_secs(60),
        }
    }
}

impl BackendConfig {
    /// Set the worker bound. Clamped to at least one.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Set the queue capacity.
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Set the idle keep-alive.
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

#[derive(Default)]
struct State {
    queue: VecDeque<Task>,
    live: usize,
    idle: usize,
    spawned: usize,
    shutdown: bool,
}

struct Shared {
    config: BackendConfig,
    state: Mutex<State>,
    available: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A bounded thread pool.
///
/// Cloning yields another handle to the same pool.
#[derive(Clone)]
pub struct BoundedExecutor {
    shared: Arc<Shared>,
}

impl BoundedExecutor {
    /// Create a pool. No thread is started until the first task arrives.
    pub fn new(config: BackendConfig) -> Self {
        let config = config.with_max_workers(config.max_workers);
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(State::default()),
                available: Condvar::new(),
            }),
        }
    }

    /// The pool's sizing.
    pub fn config(&self) -> BackendConfig {
        self.shared.config
    }

    /// Worker threads currently alive.
    pub fn live_workers(&self) -> usize {
        self.shared.lock().live
    }

    /// Tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Refuse new tasks. Queued tasks still run; idle workers exit.
    pub fn shutdown(&self) {
        self.shared.lock().shutdown = true;
        self.shared.available.notify_all();
    }

    fn spawn_worker(&self, state: &mut State, first: Task) -> JobResult<()> {
        state.spawned += 1;
        let name = format!("jobdesk-worker-{}", state.spawned);
        let shared = self.shared.clone();
        thread::Builder::new()
            .name(name)
            .spawn(move || work(shared, first))
            .map(|_| ())
            .map_err(|err| JobError::other("could not start a backend worker").with_cause(err))
    }
}

impl Default for BoundedExecutor {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}

impl Executor for BoundedExecutor {
    fn execute(&self, task: Task) -> JobResult<()> {
        let mut state = self.shared.lock();
        if state.shutdown {
            return Err(JobError::other("execution backend is shut down"));
        }

        // Hand off to a worker that is already waiting.
        if state.idle > state.queue.len() {
            state.queue.push_back(task);
            drop(state);
            self.shared.available.notify_one();
            return Ok(());
        }

        if state.live < self.shared.config.max_workers {
            state.live += 1;
            let spawned = self.spawn_worker(&mut state, task);
            if spawned.is_err() {
                state.live -= 1;
            }
            return spawned;
        }

        if state.queue.len() < state.idle + self.shared.config.queue_capacity {
            state.queue.push_back(task);
            drop(state);
            self.shared.available.notify_one();
            return Ok(());
        }

        Err(JobError::other(format!(
            "execution backend is saturated: {} worker(s) busy, {} task(s) queued",
            state.live,
            state.queue.len()
        )))
    }
}

impl std::fmt::Debug for BoundedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("BoundedExecutor")
            .field("config", &self.shared.config)
            .field("live", &state.live)
            .field("idle", &state.idle)
            .field("queued", &state.queue.len())
            .finish()
    }
}

fn work(shared: Arc<Shared>, first: Task) {
    let mut next = Some(first);
    loop {
        if let Some(task) = next.take() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
                tracing::error!(?payload, "backend task panicked");
            }
        }

        let mut state = shared.lock();
        loop {
            if let Some(task) = state.queue.pop_front() {
                next = Some(task);
                break;
            }
            if state.shutdown {
                state.live -= 1;
                return;
            }
            state.idle += 1;
            let (guard, wait) = shared
                .available
                .wait_timeout(state, shared.config.keep_alive)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            state.idle -= 1;
            if wait.timed_out() && state.queue.is_empty() {
                state.live -= 1;
                return;
            }
        }
    }
}

/// Runs every task immediately on the submitting thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) -> JobResult<()> {
        task();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobdesk_core::ErrorKind;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc,
    };

    #[test]
    fn default_backend_rejects_while_busy() {
        let backend = BoundedExecutor::default();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        backend
            .execute(Box::new(move || {
                started_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            }))
            .unwrap();
        started_rx.recv().unwrap();

        let err = backend.execute(Box::new(|| {})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert!(err.message().contains("saturated"));

        release_tx.send(()).unwrap();
    }

    #[test]
    fn idle_worker_takes_the_next_task() {
        let backend = BoundedExecutor::default();
        let (tx, rx) = mpsc::channel();

        let first = tx.clone();
        backend.execute(Box::new(move || first.send(1).unwrap())).unwrap();
        assert_eq!(rx.recv().unwrap(), 1);

        // Wait until the worker parks, then hand it another task.
        while backend.shared.lock().idle == 0 {
            thread::yield_now();
        }
        backend.execute(Box::new(move || tx.send(2).unwrap())).unwrap();
        assert_eq!(rx.recv().unwrap(), 2);
        assert_eq!(backend.live_workers(), 1);
    }

    #[test]
    fn queue_capacity_admits_waiting_tasks() {
        let backend = BoundedExecutor::new(BackendConfig::default().with_queue_capacity(2));
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (started_tx, started_rx) = mpsc::channel();
        let ran = Arc::new(AtomicUsize::new(0));

        backend
            .execute(Box::new(move || {
                started_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            }))
            .unwrap();
        started_rx.recv().unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        for _ in 0..2 {
            let ran = ran.clone();
            let done = done_tx.clone();
            backend
                .execute(Box::new(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                    done.send(()).unwrap();
                }))
                .unwrap();
        }
        assert!(backend.execute(Box::new(|| {})).is_err());

        release_tx.send(()).unwrap();
        done_rx.recv().unwrap();
        done_rx.recv().unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_task_does_not_kill_the_worker() {
        let backend = BoundedExecutor::default();
        backend.execute(Box::new(|| panic!("boom"))).unwrap();

        let (tx, rx) = mpsc::channel();
        loop {
            let tx = tx.clone();
            if backend.execute(Box::new(move || tx.send(()).unwrap())).is_ok() {
                break;
            }
            thread::yield_now();
        }
        rx.recv().unwrap();
    }

    #[test]
    fn idle_workers_exit_after_keep_alive() {
        let backend = BoundedExecutor::new(
            BackendConfig::default().with_keep_alive(Duration::from_millis(10)),
        );
        let (tx, rx) = mpsc::channel();
        backend.execute(Box::new(move || tx.send(()).unwrap())).unwrap();
        rx.recv().unwrap();
        while backend.live_workers() > 0 {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(backend.live_workers(), 0);
    }

    #[test]
    fn shutdown_refuses_new_tasks() {
        let backend = BoundedExecutor::default();
        backend.shutdown();
        assert!(backend.execute(Box::new(|| {})).is_err());
    }

    #[test]
    fn inline_runs_on_the_caller() {
        let id = thread::current().id();
        let (tx, rx) = mpsc::channel();
        InlineExecutor
            .execute(Box::new(move || tx.send(thread::current().id()).unwrap()))
            .unwrap();
        assert_eq!(rx.recv().unwrap(), id);
    }
}
