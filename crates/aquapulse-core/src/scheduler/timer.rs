//! Cancellable single-shot timer.
//!
//! Each `DeferredTimer` owns at most one spawned tokio task. Arming cancels
//! the previous instance first. Every arm/cancel bumps a generation counter;
//! a task that wakes up must `release` its generation under the engine lock
//! before acting, so a superseded wake-up never fires.

use std::future::Future;

use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub(crate) struct DeferredTimer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl DeferredTimer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to run after `delay`, replacing any pending instance.
    pub(crate) fn arm<F, Fut>(&mut self, delay: chrono::Duration, task: F) -> u64
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        let delay = delay.to_std().unwrap_or_default();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task(generation).await;
        }));
        generation
    }

    pub(crate) fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Called by a woken task. Returns false if that wake-up was superseded;
    /// otherwise detaches the handle so the running task is not aborted by
    /// the next `arm`.
    pub(crate) fn release(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.handle.is_none() {
            return false;
        }
        self.handle = None;
        true
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for DeferredTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
