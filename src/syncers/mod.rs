//! Barrier primitives enqueued like tasks to impose cross-runner ordering.
//!
//! Syncers are free-standing values, not owned by any runner: one syncer is
//! typically enqueued onto several runners at once. Their counters and
//! gates are the only mutable state intentionally shared across runners.
//!
//! The invariant callers must uphold: an acknowledge count must equal
//! exactly the number of runners the syncer is enqueued onto. A count that
//! is too low releases waiters prematurely; too high deadlocks them until
//! the wait times out.

pub mod acknowledge;
pub mod block;

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

pub use acknowledge::AcknowledgeSyncer;
pub use block::{AcknowledgeBlockSyncer, BlockSyncer, RestartBlockSyncer};

/// Default bound for acknowledge-barrier waits.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors surfaced by syncer wait operations.
#[derive(Debug, Error, Diagnostic)]
pub enum SyncerError {
    /// An acknowledge wait exceeded its bound. Reported, not fatal.
    #[error("barrier '{label}' timed out with {remaining} acknowledgements outstanding")]
    #[diagnostic(
        code(syncline::syncers::ack_timeout),
        help("Check that the acknowledge count matches the number of runners the syncer was enqueued onto.")
    )]
    Timeout { label: String, remaining: usize },
}

/// A barrier entry a runner can execute in place of a task.
///
/// Tagged-variant dispatch: the runner matches on the variant, so every
/// barrier behavior is known at compile time rather than resolved through
/// a runtime identity string.
#[derive(Clone, Debug)]
pub enum Syncer {
    /// Decrement and continue; never blocks the executing runner.
    Acknowledge(AcknowledgeSyncer),
    /// Block the executing runner until an external `restart()`.
    Block(BlockSyncer),
    /// Open another syncer's gate and continue.
    RestartBlock(RestartBlockSyncer),
    /// Decrement, then block until `restart()`.
    AcknowledgeBlock(AcknowledgeBlockSyncer),
}

impl Syncer {
    /// Diagnostic identity reported by `queued()` and stuck-queue logs.
    #[must_use]
    pub fn identity(&self) -> String {
        match self {
            Syncer::Acknowledge(s) => format!("syncer.acknowledge:{}", s.label()),
            Syncer::Block(s) => format!("syncer.block:{}", s.label()),
            Syncer::RestartBlock(s) => format!("syncer.restart_block:{}", s.target().label()),
            Syncer::AcknowledgeBlock(s) => format!("syncer.acknowledge_block:{}", s.label()),
        }
    }

    /// Execute the barrier half that belongs to the queueing runner.
    pub async fn execute(&self) {
        match self {
            Syncer::Acknowledge(s) => s.acknowledge(),
            Syncer::Block(s) => s.wait_open().await,
            Syncer::RestartBlock(s) => s.target().restart(),
            Syncer::AcknowledgeBlock(s) => {
                s.acknowledge();
                s.wait_open().await;
            }
        }
    }
}

impl From<AcknowledgeSyncer> for Syncer {
    fn from(s: AcknowledgeSyncer) -> Self {
        Syncer::Acknowledge(s)
    }
}

impl From<BlockSyncer> for Syncer {
    fn from(s: BlockSyncer) -> Self {
        Syncer::Block(s)
    }
}

impl From<RestartBlockSyncer> for Syncer {
    fn from(s: RestartBlockSyncer) -> Self {
        Syncer::RestartBlock(s)
    }
}

impl From<AcknowledgeBlockSyncer> for Syncer {
    fn from(s: AcknowledgeBlockSyncer) -> Self {
        Syncer::AcknowledgeBlock(s)
    }
}
