use crate::{inner::ThreadPoolInner, slot::SlotId, Job};
use scopeguard::defer_on_unwind;
use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};
use tracing::trace;

pub(super) struct Worker {
    inner: Arc<ThreadPoolInner>,
    slot: SlotId,
    epoch: u64,
}

impl Worker {
    pub(super) fn new(inner: Arc<ThreadPoolInner>, slot: SlotId, epoch: u64) -> Self {
        Self { inner, slot, epoch }
    }

    /// Start the thread with `job` as its first job
    pub(super) fn start(self, pool_name: &str, job: Job) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("{pool_name}-worker-{}", self.slot))
            .spawn(move || self.worker_loop(job))
    }

    fn worker_loop(self, job: Job) {
        let Self { inner, slot, epoch } = self;

        // A panicking job ends this thread. The slot is marked finished while unwinding, so the
        // dispatcher can put a fresh thread in it for the rest of the queue
        defer_on_unwind! {
            inner.abandon_slot(slot, epoch);
        };

        trace!(%slot, epoch, "worker started");

        job();
        thread::yield_now();

        // Serve the queue directly until it is empty. `next_job` marks the slot finished when
        // it returns `None`
        while let Some(job) = inner.next_job(slot, epoch) {
            job();
            thread::yield_now();
        }

        trace!(%slot, epoch, "queue is empty, worker exits");
    }
}
