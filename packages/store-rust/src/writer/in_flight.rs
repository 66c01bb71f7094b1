//! In-flight batch tracking with a drain barrier.
//!
//! An atomic counter with RAII guards counts batches accepted for writing
//! but not yet completed. [`InFlightTracker::wait_idle`] parks on a
//! [`Notify`] until the count returns to zero.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Counts in-flight batches and wakes drain waiters when the count hits zero.
///
/// The count is zero if and only if no guard is alive, so a batch holding a
/// guard keeps [`wait_idle`](InFlightTracker::wait_idle) parked whether it is
/// waiting in the dispatch channel or being written.
#[derive(Debug, Default)]
pub struct InFlightTracker {
    count: AtomicU64,
    idle: Notify,
}

impl InFlightTracker {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers one in-flight batch. The count drops when the guard is dropped.
    #[must_use]
    pub fn acquire(self: &Arc<Self>) -> InFlightGuard {
        self.count.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            tracker: Arc::clone(self),
        }
    }

    /// Current number of in-flight batches.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// Waits until no batch is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before re-checking so a release between the check and
            // the await cannot be missed.
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Waits until no batch is in flight, up to `timeout`.
    ///
    /// Returns `true` if the tracker drained, `false` if the timeout expired first.
    pub async fn wait_idle_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_idle()).await.is_ok()
    }

    fn release(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// RAII guard for one in-flight batch.
///
/// Travels with the batch through the dispatch channel, so a batch that is
/// dropped undelivered still releases its slot.
#[derive(Debug)]
pub struct InFlightGuard {
    tracker: Arc<InFlightTracker>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.release();
    }
}
