use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::{AcknowledgeSyncer, SyncerError};

/// Manually-released gate: executing runners block until an external
/// `restart()` opens it.
///
/// The gate is one-shot: once opened it stays open, so late arrivals pass
/// straight through. A new barrier round uses a fresh syncer.
///
/// # Examples
///
/// ```
/// use syncline::syncers::BlockSyncer;
///
/// # async fn demo() {
/// let gate = BlockSyncer::new();
/// assert!(!gate.is_open());
/// gate.restart();
/// gate.wait_open().await; // resolves immediately
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct BlockSyncer {
    inner: Arc<BlockInner>,
}

#[derive(Debug)]
struct BlockInner {
    label: String,
    gate: watch::Sender<bool>,
}

impl Default for BlockSyncer {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockSyncer {
    pub fn new() -> Self {
        Self::labeled("block")
    }

    pub fn labeled(label: impl Into<String>) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            inner: Arc::new(BlockInner {
                label: label.into(),
                gate,
            }),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.inner.gate.borrow()
    }

    /// Open the gate, releasing every runner blocked on it.
    pub fn restart(&self) {
        tracing::debug!(syncer = %self.inner.label, "gate opened");
        self.inner.gate.send_replace(true);
    }

    /// Suspend until the gate is opened.
    pub async fn wait_open(&self) {
        let mut gate = self.inner.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
    }
}

/// Executing this syncer calls `restart()` on its target gate.
///
/// Lets a late-joining runner be made responsible for releasing an existing
/// [`BlockSyncer`]: enqueue the gate on the runners that must hold, then a
/// `RestartBlockSyncer` on the runner whose progress releases them.
#[derive(Clone, Debug)]
pub struct RestartBlockSyncer {
    target: BlockSyncer,
}

impl RestartBlockSyncer {
    pub fn new(target: BlockSyncer) -> Self {
        Self { target }
    }

    #[must_use]
    pub fn target(&self) -> &BlockSyncer {
        &self.target
    }
}

/// Countdown composed with a gate.
///
/// Executing runners first decrement the acknowledge counter, then block on
/// the gate. A separate waiter awaits the counter reaching zero (all
/// runners caught up), does its structural work, and calls `restart()` to
/// release everyone. This is the object-creation barrier: all other
/// entities' runners hold until the new entity finishes its initial setup.
#[derive(Clone, Debug)]
pub struct AcknowledgeBlockSyncer {
    ack: AcknowledgeSyncer,
    gate: BlockSyncer,
}

impl AcknowledgeBlockSyncer {
    pub fn new(count: usize) -> Self {
        Self::labeled(count, format!("ack_block({count})"))
    }

    pub fn labeled(count: usize, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            ack: AcknowledgeSyncer::labeled(count, label.clone()),
            gate: BlockSyncer::labeled(label),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.ack.label()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.ack.remaining()
    }

    pub fn acknowledge(&self) {
        self.ack.acknowledge();
    }

    pub async fn wait_open(&self) {
        self.gate.wait_open().await;
    }

    /// Wait for every runner to have executed its acknowledge half.
    pub async fn wait_acknowledged(&self, timeout: Duration) -> Result<(), SyncerError> {
        self.ack.wait_acknowledged(timeout).await
    }

    /// Release all blocked runners.
    pub fn restart(&self) {
        self.gate.restart();
    }
}
