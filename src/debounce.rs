//! Quiet-period timer for autosave.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Handle to at most one delayed task.
///
/// Scheduling again before the quiet period elapses replaces the pending task, so
/// bursts of calls collapse into one run. Once the timer fires the task is detached:
/// cancelling after that point does not interrupt it.
pub struct Debouncer {
    quiet: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Run `task` after the quiet period, replacing any pending task.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let replaced = self.cancel();
        let quiet = self.quiet;
        debug!(quiet_ms = quiet.as_millis() as u64, replaced, "timer armed");
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            tokio::spawn(task);
        }));
    }

    /// Drop the pending task. Returns whether one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }

    /// Whether a task is armed and its timer has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
