use crate::inner::ThreadPoolInner;
use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};
use tracing::debug;

/// Background thread that reconciles the queue backlog against the worker slots on every tick.
///
/// It keeps the pool alive while there is still work to hand out and exits once nothing but
/// itself references an idle pool. The handle is never joined, so it does not hold up process
/// exit.
pub(super) struct Dispatcher {
    _handle: JoinHandle<()>,
}

impl Dispatcher {
    pub(super) fn start(inner: Arc<ThreadPoolInner>) -> io::Result<Self> {
        let name = format!("{}-dispatcher", inner.config().name);
        let jh = thread::Builder::new()
            .name(name)
            .spawn(move || Self::dispatch_loop(inner))?;

        Ok(Self { _handle: jh })
    }

    fn dispatch_loop(inner: Arc<ThreadPoolInner>) {
        let interval = inner.config().poll_interval;
        debug!(?interval, "dispatcher started");

        loop {
            ThreadPoolInner::reconcile(&inner);

            if ThreadPoolInner::is_abandoned(&inner) {
                break;
            }

            thread::sleep(interval);
        }

        debug!("thread pool is dropped and idle, dispatcher exits");
    }
}
