//! Bounded worker pool for background cache rebuilds.
//!
//! ## Task Flow
//!
//! ```text
//! stale reader ─ try_acquire(lock) ─ submit(task) ─▶ queue ─▶ worker
//!                                                            │
//!                                   refresh (fetch, encode, SET)
//!                                                            │
//!                                              release(lock) ◀┘  (always)
//! ```
//!
//! Submission never waits: when the queue is full the task is dropped, its
//! lock released, and the entry simply stays stale until the next reader
//! triggers another attempt.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CacheError, CacheResult};
use crate::lock::LockGuard;

/// One unit of rebuild work.
pub struct RebuildTask {
    key: String,
    guard: LockGuard,
    refresh: BoxFuture<'static, CacheResult<()>>,
}

impl RebuildTask {
    /// `refresh` recomputes and writes `key`; `guard` is released once it ends.
    pub fn new<F>(key: impl Into<String>, guard: LockGuard, refresh: F) -> Self
    where
        F: Future<Output = CacheResult<()>> + Send + 'static,
    {
        Self {
            key: key.into(),
            guard,
            refresh: Box::pin(refresh),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for RebuildTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebuildTask")
            .field("key", &self.key)
            .field("lock", &self.guard.key())
            .finish_non_exhaustive()
    }
}

/// Outcome of [`RebuildDispatcher::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The task is queued for a worker.
    Queued,
    /// The queue was full; the task was discarded and its lock released.
    Dropped,
}

/// Dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug)]
struct Inner {
    sender: Mutex<Option<mpsc::Sender<RebuildTask>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

/// Fixed-size pool executing [`RebuildTask`]s off the request path.
///
/// The pool is an owned resource: [`RebuildDispatcher::start`] spawns the
/// workers and [`RebuildDispatcher::shutdown`] stops accepting work, drains
/// the queue and waits for in-flight tasks. Clones share the same pool.
#[derive(Debug, Clone)]
pub struct RebuildDispatcher {
    inner: Arc<Inner>,
}

impl RebuildDispatcher {
    /// Spawns `workers` workers on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel::<RebuildTask>(queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let counters = Arc::new(Counters::default());

        let handles = (0..workers)
            .map(|id| tokio::spawn(worker_loop(id, Arc::clone(&rx), Arc::clone(&counters))))
            .collect();

        info!(workers, queue_capacity, "rebuild dispatcher started");

        Self {
            inner: Arc::new(Inner {
                sender: Mutex::new(Some(tx)),
                workers: Mutex::new(handles),
                counters,
            }),
        }
    }

    /// Queues a task without waiting.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::DispatcherClosed` after [`RebuildDispatcher::shutdown`].
    /// The task's lock is released in every non-queued case.
    pub fn submit(&self, task: RebuildTask) -> CacheResult<Submission> {
        let sender = self.inner.sender.lock();
        let Some(tx) = sender.as_ref() else {
            // Dropping the task drops its guard, which releases the lock.
            return Err(CacheError::DispatcherClosed);
        };

        match tx.try_send(task) {
            Ok(()) => {
                self.inner.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(Submission::Queued)
            }
            Err(TrySendError::Full(task)) => {
                self.inner.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(key = %task.key, "rebuild queue full, dropping rebuild");
                Ok(Submission::Dropped)
            }
            Err(TrySendError::Closed(_)) => Err(CacheError::DispatcherClosed),
        }
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> DispatcherStats {
        let c = &self.inner.counters;
        DispatcherStats {
            submitted: c.submitted.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
        }
    }

    /// Returns `true` once shutdown has begun.
    pub fn is_closed(&self) -> bool {
        self.inner.sender.lock().is_none()
    }

    /// Rejects new submissions, then waits for queued and in-flight tasks.
    ///
    /// Idempotent; only the first call waits for the workers.
    pub async fn shutdown(&self) {
        let sender = self.inner.sender.lock().take();
        drop(sender);

        let handles: Vec<_> = std::mem::take(&mut *self.inner.workers.lock());
        if handles.is_empty() {
            return;
        }

        info!(workers = handles.len(), "rebuild dispatcher draining");
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "rebuild worker terminated abnormally");
            }
        }
        info!(stats = ?self.stats(), "rebuild dispatcher stopped");
    }
}

async fn worker_loop(
    id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<RebuildTask>>>,
    counters: Arc<Counters>,
) {
    loop {
        let next = { rx.lock().await.recv().await };
        let Some(task) = next else {
            debug!(worker = id, "rebuild worker exiting");
            return;
        };
        run_task(id, task, &counters).await;
    }
}

async fn run_task(worker: usize, task: RebuildTask, counters: &Counters) {
    let RebuildTask {
        key,
        guard,
        refresh,
    } = task;

    match AssertUnwindSafe(refresh).catch_unwind().await {
        Ok(Ok(())) => {
            counters.completed.fetch_add(1, Ordering::Relaxed);
            debug!(worker, key = %key, "cache rebuilt");
        }
        Ok(Err(e)) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(worker, key = %key, error = %e, "cache rebuild failed, keeping stale entry");
        }
        Err(_) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(worker, key = %key, "cache rebuild panicked, keeping stale entry");
        }
    }

    if let Err(e) = guard.release().await {
        debug!(worker, key = %key, error = %e, "lock left to expire");
    }
}
