//! Per-entity ordered execution queues.
//!
//! Every runner owns a FIFO queue of tasks and syncers plus one dedicated
//! worker task that drains it head-by-head. Within a runner, submission
//! order is execution order, unconditionally; at most one entry from a
//! given runner is ever executing at a time. An entry that fails drops the
//! whole remaining queue before the fault continues up the chain, so no
//! operation runs against remote state whose prior step is known bad.

pub mod batched;
mod core;
pub mod document;
pub mod ordered;
pub mod registry;

use std::time::Duration;

pub use batched::BatchedOrderedRunner;
pub use document::{BatchHook, DocumentRunner};
pub use ordered::OrderedRunner;
pub use registry::{DocumentId, RunnerRegistry};

use crate::syncers::Syncer;
use crate::task::Task;

/// Default bound for queue-drain waits.
pub const DEFAULT_CLOSEOUT_TIMEOUT: Duration = Duration::from_secs(10);

/// One queue slot: an ordinary task or an injected barrier.
#[derive(Debug)]
pub(crate) enum QueueEntry {
    Task(Task),
    Syncer(Syncer),
}

impl QueueEntry {
    pub(crate) fn identity(&self) -> String {
        match self {
            QueueEntry::Task(task) => task.name().encode(),
            QueueEntry::Syncer(syncer) => syncer.identity(),
        }
    }
}

/// Outcome of a closeout wait.
///
/// A timed-out wait is diagnostic, not fatal: it reports what was still
/// executing and queued, and the runner keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closeout {
    /// The queue drained to empty and the runner is idle.
    Drained,
    /// The wait bound elapsed first.
    TimedOut {
        /// Identity of the entry executing when the bound elapsed.
        executing: Option<String>,
        /// Identities of the not-yet-started entries.
        pending: Vec<String>,
    },
}

impl Closeout {
    #[must_use]
    pub fn is_drained(&self) -> bool {
        matches!(self, Closeout::Drained)
    }
}
