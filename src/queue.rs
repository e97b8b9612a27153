use super::Job;
use crate::PoolError;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// FIFO of pending jobs.
///
/// Every operation takes the queue lock for its own duration only. Callers that need the queue
/// state to agree with the slot collection must already hold the slots lock, so the lock order
/// is always slots -> queue.
#[derive(Default)]
pub struct WorkQueue {
    inner: Mutex<VecDeque<Job>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append job to the tail
    pub fn enqueue(&self, job: Option<Job>) -> Result<(), PoolError> {
        let job = job.ok_or(PoolError::InvalidArgument("work item is absent"))?;
        self.push(job);
        Ok(())
    }

    pub fn push(&self, job: Job) {
        self.inner.lock().push_back(job);
    }

    /// Put a job that was taken but could not be served back at the head
    pub fn requeue(&self, job: Job) {
        self.inner.lock().push_front(job);
    }

    pub fn try_dequeue(&self) -> Option<Job> {
        self.inner.lock().pop_front()
    }

    /// Point-in-time size, may be stale as soon as it is returned
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
