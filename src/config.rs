//! Pool configuration

use std::{num::NonZeroUsize, thread, time::Duration};

/// Default time between two reconciliation passes of the dispatcher
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Prefix for the names of the threads owned by the pool
    pub name: String,

    /// Upper bound of concurrently live worker threads
    pub max_threads: NonZeroUsize,

    /// How often the dispatcher reconciles backlog against workers. This is also the upper bound
    /// of the delay between a submission and the spawn of a worker for it, when no running worker
    /// picks it up first
    pub poll_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: String::from("tickpool"),
            max_threads: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PoolConfig {
    pub fn new(max_threads: NonZeroUsize) -> Self {
        Self {
            max_threads,
            ..Self::default()
        }
    }

    /// Set thread name prefix
    ///
    /// # Panics
    ///
    /// Panics if the name contains null bytes.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        assert!(
            !name.as_bytes().contains(&0),
            "thread pool name must not contain null bytes"
        );
        self.name = name;
        self
    }

    pub fn max_threads(mut self, max_threads: NonZeroUsize) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the dispatcher tick. A zero interval is raised to one millisecond.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }
}
