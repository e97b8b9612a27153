use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
    thread::JoinHandle,
};

/// Identity of a slot. Stays the same when the slot gets a new thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SlotId(usize);

impl SlotId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState {
    Running,
    Finished,
}

/// Bookkeeping for one worker thread.
///
/// `epoch` is bumped every time the slot is handed a new thread, so a thread can only ever
/// finish the slot it was started for.
pub(crate) struct WorkerSlot {
    id: SlotId,
    epoch: u64,
    state: SlotState,
    handle: Option<JoinHandle<()>>,
}

impl WorkerSlot {
    /// New running slot. The thread handle is attached after the thread is started.
    pub(crate) fn new() -> Self {
        Self {
            id: SlotId::next(),
            epoch: 0,
            state: SlotState::Running,
            handle: None,
        }
    }

    pub(crate) fn id(&self) -> SlotId {
        self.id
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.state == SlotState::Finished
    }

    /// Running -> Finished. Returns `false` if the transition is not allowed for this epoch.
    pub(crate) fn finish(&mut self, epoch: u64) -> bool {
        if self.epoch != epoch || self.state != SlotState::Running {
            return false;
        }

        self.state = SlotState::Finished;
        true
    }

    /// Give a finished slot a new execution. Returns the handle of the previous thread.
    pub(crate) fn renew(&mut self) -> Option<JoinHandle<()>> {
        debug_assert!(self.is_finished());
        self.epoch += 1;
        self.state = SlotState::Running;
        self.handle.take()
    }

    pub(crate) fn attach(&mut self, handle: JoinHandle<()>) {
        self.handle = Some(handle);
    }

    pub(crate) fn take_handle(&mut self) -> Option<JoinHandle<()>> {
        self.handle.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finishes_once_per_epoch() {
        let mut slot = WorkerSlot::new();
        let id = slot.id();

        assert!(!slot.is_finished());
        assert!(slot.finish(0));
        assert!(!slot.finish(0));

        slot.renew();
        assert_eq!(slot.id(), id);
        assert_eq!(slot.epoch(), 1);
        assert!(!slot.is_finished());

        // stale thread of the previous epoch cannot finish the renewed slot
        assert!(!slot.finish(0));
        assert!(slot.finish(1));
    }
}
