//! Fixed-capacity thread pool.
//!
//! Jobs go to a FIFO queue. A background dispatcher wakes up every
//! [`PoolConfig::poll_interval`] and reconciles the backlog against the worker threads: it reaps
//! one finished worker or hands one queued job to a new (or renewed) worker, never exceeding
//! [`PoolConfig::max_threads`] live threads. Workers run their first job, then keep pulling jobs
//! from the queue themselves until it is empty, and exit.

mod config;
mod dispatcher;
mod error;
mod inner;
mod queue;
mod slot;
mod worker;

pub use config::{PoolConfig, DEFAULT_POLL_INTERVAL};
pub use error::{JoinError, PoolError};

use self::inner::ThreadPoolInner;
use std::{num::NonZeroUsize, sync::Arc};

#[cfg(test)]
mod tests;

/// Job for worker
pub type Job = Box<dyn FnOnce() + Send>;

/// Snapshot of the pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub max_threads: usize,
    /// Jobs accepted since the pool was created
    pub total_queued: usize,
    /// Workers that ran out of work and wait to be reaped
    pub finished_threads: usize,
    /// Highest number of concurrently live workers seen so far
    pub used_threads: usize,
    pub live_threads: usize,
    pub slots: usize,
    pub queued: usize,
}

/// Handle to the pool. Clones share the same pool.
#[derive(Clone)]
pub struct ThreadPool(Arc<ThreadPoolInner>);

impl ThreadPool {
    pub fn new(max_threads: NonZeroUsize) -> Self {
        Self::with_config(PoolConfig::new(max_threads))
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Self(ThreadPoolInner::new(config))
    }

    /// Spawn new job for thread pool
    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        ThreadPoolInner::submit_job(&self.0, Box::new(job));
    }

    /// Queue a job. It runs once a worker is available; the call never waits for it.
    ///
    /// Returns [`PoolError::InvalidArgument`] if `job` is `None`.
    pub fn submit(&self, job: Option<Job>) -> Result<(), PoolError> {
        ThreadPoolInner::submit(&self.0, job)
    }

    /// Wait until the queue is drained and every worker has exited.
    ///
    /// Returns an error with the number of workers whose job panicked since the previous `join`.
    pub fn join(&self) -> Result<(), JoinError> {
        self.0.join()
    }

    pub fn config(&self) -> &PoolConfig {
        self.0.config()
    }

    pub fn max_threads(&self) -> usize {
        self.0.config().max_threads.get()
    }

    pub fn total_queued(&self) -> usize {
        self.0.total_queued()
    }

    pub fn finished_threads(&self) -> usize {
        self.0.finished_threads()
    }

    pub fn used_threads(&self) -> usize {
        self.0.used_threads()
    }

    /// Workers currently executing or looking for work
    pub fn live_threads(&self) -> usize {
        self.0.live_threads()
    }

    /// Live and finished-but-not-yet-reaped workers
    pub fn slot_count(&self) -> usize {
        self.0.slot_count()
    }

    /// Jobs waiting in the queue. Advisory only
    pub fn queued(&self) -> usize {
        self.0.queued()
    }

    pub fn stats(&self) -> PoolStats {
        self.0.stats()
    }
}
