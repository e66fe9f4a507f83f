use std::{future, time::Duration};

use tokio::time::{self, Instant};

/// Holds the most recently scheduled value until no new value has been
/// scheduled for the quiet period. The deadline is the only timer state, so
/// scheduling needs no runtime and never leaves a task behind.
pub(crate) struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub(crate) fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Replaces any pending value and restarts the quiet period.
    pub(crate) fn schedule(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.quiet));
    }

    pub(crate) fn cancel(&mut self) {
        self.pending = None;
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Waits out the quiet period of the pending value and takes it. Pends
    /// forever while nothing is scheduled.
    ///
    /// Cancel safe: dropping the future leaves the pending value in place.
    pub(crate) async fn next(&mut self) -> T {
        let Some(deadline) = self.pending.as_ref().map(|(_, deadline)| *deadline) else {
            return future::pending().await;
        };
        time::sleep_until(deadline).await;
        match self.pending.take() {
            Some((value, _)) => value,
            None => future::pending().await,
        }
    }
}
