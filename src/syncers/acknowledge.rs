use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::SyncerError;

/// Countdown barrier: counts down from `n`, fires a one-shot ready signal
/// at zero.
///
/// Runners executing it only decrement and continue; they never block. A
/// separate waiter can await the counter reaching zero, which is how
/// object-removal confirms every other runner has passed the removal point
/// before the object is actually deleted.
///
/// # Examples
///
/// ```
/// use syncline::syncers::AcknowledgeSyncer;
///
/// # async fn demo() {
/// let syncer = AcknowledgeSyncer::new(2);
/// syncer.acknowledge();
/// assert_eq!(syncer.remaining(), 1);
/// syncer.acknowledge();
/// syncer.acknowledged().await; // resolves immediately now
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct AcknowledgeSyncer {
    inner: Arc<AckInner>,
}

#[derive(Debug)]
struct AckInner {
    label: String,
    remaining: Mutex<usize>,
    ready: watch::Sender<bool>,
}

impl AcknowledgeSyncer {
    pub fn new(count: usize) -> Self {
        Self::labeled(count, format!("ack({count})"))
    }

    pub fn labeled(count: usize, label: impl Into<String>) -> Self {
        let (ready, _) = watch::channel(count == 0);
        Self {
            inner: Arc::new(AckInner {
                label: label.into(),
                remaining: Mutex::new(count),
                ready,
            }),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        *self.inner.remaining.lock()
    }

    /// Count down one runner. Saturates at zero; the count/fan-out match is
    /// the caller's contract.
    pub fn acknowledge(&self) {
        let mut remaining = self.inner.remaining.lock();
        if *remaining == 0 {
            tracing::debug!(syncer = %self.inner.label, "acknowledge past zero ignored");
            return;
        }
        *remaining -= 1;
        tracing::debug!(syncer = %self.inner.label, remaining = *remaining, "acknowledged");
        if *remaining == 0 {
            self.inner.ready.send_replace(true);
        }
    }

    /// Suspend until every runner has acknowledged.
    pub async fn acknowledged(&self) {
        let mut ready = self.inner.ready.subscribe();
        // The sender lives inside `inner`, so this wait cannot observe a
        // closed channel while `self` is alive.
        let _ = ready.wait_for(|done| *done).await;
    }

    /// Bounded wait for all acknowledgements.
    pub async fn wait_acknowledged(&self, timeout: Duration) -> Result<(), SyncerError> {
        tokio::time::timeout(timeout, self.acknowledged())
            .await
            .map_err(|_| SyncerError::Timeout {
                label: self.inner.label.clone(),
                remaining: self.remaining(),
            })
    }
}
