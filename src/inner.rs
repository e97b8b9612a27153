use super::{queue::WorkQueue, Job, JoinError, PoolConfig, PoolError, PoolStats};
use crate::{
    dispatcher::Dispatcher,
    error::fatal,
    slot::{SlotId, WorkerSlot},
    worker::Worker,
};
use parking_lot::{Condvar, Mutex};
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread::JoinHandle,
};
use tracing::{debug, warn};

pub(super) struct ThreadPoolInner {
    config: PoolConfig,
    job_queue: WorkQueue,
    /// Lock order: `slots` first, then the queue lock inside `job_queue`
    slots: Mutex<Vec<WorkerSlot>>,
    /// Signalled when the pool has no slots and no queued jobs
    idle: Condvar,
    dispatcher: Mutex<Option<Dispatcher>>,
    total_queued: AtomicUsize,
    finished_threads: AtomicUsize,
    used_threads: AtomicUsize,
    panicked_threads: AtomicUsize,
}

impl ThreadPoolInner {
    pub(super) fn new(config: PoolConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            job_queue: WorkQueue::new(),
            slots: Mutex::new(Vec::new()),
            idle: Condvar::new(),
            dispatcher: Mutex::new(None),
            total_queued: AtomicUsize::new(0),
            finished_threads: AtomicUsize::new(0),
            used_threads: AtomicUsize::new(0),
            panicked_threads: AtomicUsize::new(0),
        })
    }

    pub(super) fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Enqueue job and make sure the dispatcher is running
    pub(super) fn submit(this: &Arc<Self>, job: Option<Job>) -> Result<(), PoolError> {
        this.job_queue.enqueue(job)?;
        Self::accepted(this);
        Ok(())
    }

    /// Same as [`Self::submit`] for a job that is known to be present
    pub(super) fn submit_job(this: &Arc<Self>, job: Job) {
        this.job_queue.push(job);
        Self::accepted(this);
    }

    fn accepted(this: &Arc<Self>) {
        this.total_queued.fetch_add(1, Ordering::AcqRel);

        let mut dispatcher = this.dispatcher.lock();
        if dispatcher.is_none() {
            let started = Dispatcher::start(Arc::clone(this)).unwrap_or_else(|e| fatal(e.into()));
            *dispatcher = Some(started);
        }
    }

    /// One reconciliation pass: reap at most one finished slot, or hand at most one queued job
    /// to a new thread.
    pub(super) fn reconcile(this: &Arc<Self>) {
        let max_threads = this.config.max_threads.get();

        let assigned = {
            let mut slots = this.slots.lock();

            let candidate = if this.finished_threads.load(Ordering::Acquire) > 0 {
                slots.iter().position(WorkerSlot::is_finished)
            } else {
                None
            };

            let live = live_count(&slots);
            this.record_high_water(live);

            let job = if live < max_threads {
                this.job_queue.try_dequeue()
            } else {
                None
            };

            let assigned = match (job, candidate) {
                (None, None) => None,
                (None, Some(idx)) => {
                    // A job may have arrived after the dequeue attempt. Keep the slot then, it
                    // will be renewed on the next pass.
                    if this.job_queue.is_empty() {
                        let mut slot = slots.remove(idx);
                        this.release_finished();
                        debug!(slot = %slot.id(), "reaped finished worker");

                        if let Some(handle) = slot.take_handle() {
                            this.join_worker(slot.id(), handle);
                        }
                    }
                    None
                }
                (Some(job), Some(idx)) => {
                    let slot = &mut slots[idx];
                    let previous = slot.renew();
                    this.release_finished();
                    debug!(slot = %slot.id(), epoch = slot.epoch(), "reusing finished slot");

                    if let Some(handle) = previous {
                        this.join_worker(slot.id(), handle);
                    }
                    Some((slot.id(), slot.epoch(), job))
                }
                (Some(job), None) if slots.len() < max_threads => {
                    let slot = WorkerSlot::new();
                    debug!(slot = %slot.id(), "adding worker slot");
                    let assigned = (slot.id(), slot.epoch(), job);
                    slots.push(slot);
                    Some(assigned)
                }
                (Some(job), None) => {
                    // Saturated. Let running workers take it
                    this.job_queue.requeue(job);
                    None
                }
            };

            this.record_high_water(live_count(&slots));
            assigned
        };

        if let Some((id, epoch, job)) = assigned {
            let worker = Worker::new(Arc::clone(this), id, epoch);
            let handle = worker
                .start(&this.config.name, job)
                .unwrap_or_else(|e| fatal(e.into()));
            this.attach(id, handle);
        }

        this.notify_if_idle();
    }

    /// Hand the next queued job to the worker of slot `id`. If there is none, the slot is marked
    /// finished and the worker must exit.
    pub(super) fn next_job(&self, id: SlotId, epoch: u64) -> Option<Job> {
        let mut slots = self.slots.lock();

        if let Some(job) = self.job_queue.try_dequeue() {
            return Some(job);
        }

        self.finish_slot(&mut slots, id, epoch);
        None
    }

    /// Called by a worker unwinding from a panicked job
    pub(super) fn abandon_slot(&self, id: SlotId, epoch: u64) {
        let mut slots = self.slots.lock();
        self.finish_slot(&mut slots, id, epoch);
    }

    /// Block until every queued job is executed and every worker is reaped
    pub(super) fn join(&self) -> Result<(), JoinError> {
        let mut slots = self.slots.lock();

        while !(slots.is_empty() && self.job_queue.is_empty()) {
            self.idle.wait(&mut slots);
        }

        drop(slots);

        // Every panic is reported once, so a reused pool only reports its own batch
        match self.panicked_threads.swap(0, Ordering::AcqRel) {
            0 => Ok(()),
            panicked => Err(JoinError::new(panicked)),
        }
    }

    /// Nothing can reach the pool any more except the dispatcher itself
    pub(super) fn is_abandoned(this: &Arc<Self>) -> bool {
        Arc::strong_count(this) == 1 && this.slots.lock().is_empty() && this.job_queue.is_empty()
    }

    pub(super) fn stats(&self) -> PoolStats {
        let slots = self.slots.lock();

        PoolStats {
            max_threads: self.config.max_threads.get(),
            total_queued: self.total_queued(),
            finished_threads: self.finished_threads(),
            used_threads: self.used_threads(),
            live_threads: live_count(&slots),
            slots: slots.len(),
            queued: self.job_queue.len(),
        }
    }

    pub(super) fn total_queued(&self) -> usize {
        self.total_queued.load(Ordering::Acquire)
    }

    pub(super) fn finished_threads(&self) -> usize {
        self.finished_threads.load(Ordering::Acquire)
    }

    pub(super) fn used_threads(&self) -> usize {
        self.used_threads.load(Ordering::Acquire)
    }

    pub(super) fn live_threads(&self) -> usize {
        live_count(&self.slots.lock())
    }

    pub(super) fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }

    pub(super) fn queued(&self) -> usize {
        self.job_queue.len()
    }

    fn finish_slot(&self, slots: &mut [WorkerSlot], id: SlotId, epoch: u64) {
        let Some(slot) = slots.iter_mut().find(|slot| slot.id() == id) else {
            fatal(PoolError::InternalInvariantViolation(format!(
                "worker slot {id} is missing"
            )));
        };

        if !slot.finish(epoch) {
            fatal(PoolError::InternalInvariantViolation(format!(
                "worker slot {id} cannot be finished twice in epoch {epoch}"
            )));
        }

        self.finished_threads.fetch_add(1, Ordering::AcqRel);
    }

    fn release_finished(&self) {
        if self
            .finished_threads
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_err()
        {
            fatal(PoolError::InternalInvariantViolation(String::from(
                "finished threads counter underflow",
            )));
        }
    }

    fn record_high_water(&self, live: usize) {
        self.used_threads.fetch_max(live, Ordering::AcqRel);
    }

    /// The thread has already marked its slot finished and will not touch the slots lock again,
    /// so joining it under the lock returns promptly.
    fn join_worker(&self, id: SlotId, handle: JoinHandle<()>) {
        if handle.join().is_err() {
            self.panicked_threads.fetch_add(1, Ordering::AcqRel);
            warn!(slot = %id, "worker thread panicked");
        }
    }

    fn attach(&self, id: SlotId, handle: JoinHandle<()>) {
        let mut slots = self.slots.lock();

        match slots.iter_mut().find(|slot| slot.id() == id) {
            Some(slot) => slot.attach(handle),
            None => fatal(PoolError::InternalInvariantViolation(format!(
                "worker slot {id} vanished before its thread was attached"
            ))),
        }
    }

    fn notify_if_idle(&self) {
        let slots = self.slots.lock();
        if slots.is_empty() && self.job_queue.is_empty() {
            self.idle.notify_all();
        }
    }
}

fn live_count(slots: &[WorkerSlot]) -> usize {
    slots.iter().filter(|slot| !slot.is_finished()).count()
}
