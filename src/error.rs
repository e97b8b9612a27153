use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Submitted work item is absent
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Pool bookkeeping is corrupted. Never returned to callers: the pool aborts instead
    #[error("internal invariant violation: {0}")]
    InternalInvariantViolation(String),

    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("detected panicked threads while join: {0}")]
pub struct JoinError(usize);

impl JoinError {
    pub fn new(count: usize) -> Self {
        Self(count)
    }

    /// Number of worker threads that panicked
    pub fn panicked(&self) -> usize {
        self.0
    }
}

/// Log the error and abort the process. Used when the pool state can no longer be trusted.
pub(crate) fn fatal(err: PoolError) -> ! {
    tracing::error!(error = %err, "thread pool state is corrupted, aborting");
    std::process::abort()
}
