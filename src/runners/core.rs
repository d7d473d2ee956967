use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Notify, oneshot, watch};
use tokio::task::JoinHandle;

use super::{Closeout, QueueEntry};
use crate::batchers::{BatchPlan, Batcher, plan_batch};
use crate::faults::{CauseChain, FaultEvent, FaultHub, FaultKind};
use crate::task::Task;

/// Queue state shared between a runner handle and its worker task.
///
/// The queue is only ever mutated by append from the handle side and by
/// head-removal from the worker side; the two "binary signals" of the
/// engine are `work` (something was enqueued) and `idle` (queue drained,
/// nothing executing).
pub(crate) struct RunnerCore {
    label: String,
    queue: Mutex<VecDeque<QueueEntry>>,
    work: Notify,
    idle: watch::Sender<bool>,
    executing: Mutex<Option<String>>,
    faults: FaultHub,
}

impl RunnerCore {
    pub(crate) fn new(label: String, faults: FaultHub) -> Arc<Self> {
        let (idle, _) = watch::channel(true);
        Arc::new(Self {
            label,
            queue: Mutex::new(VecDeque::new()),
            work: Notify::new(),
            idle,
            executing: Mutex::new(None),
            faults,
        })
    }

    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn faults(&self) -> &FaultHub {
        &self.faults
    }

    /// Append an entry and signal the worker. Never blocks.
    pub(crate) fn enqueue(&self, entry: QueueEntry) {
        tracing::debug!(runner = %self.label, entry = %entry.identity(), "enqueued");
        {
            // The idle flag flips under the queue lock so a drain finishing
            // concurrently cannot re-arm idle over a fresh entry.
            let mut queue = self.queue.lock();
            queue.push_back(entry);
            self.idle.send_replace(false);
        }
        self.work.notify_one();
    }

    pub(crate) async fn work_pending(&self) {
        self.work.notified().await;
    }

    /// Identities of all not-yet-started entries.
    pub(crate) fn queued(&self) -> Vec<String> {
        self.queue.lock().iter().map(QueueEntry::identity).collect()
    }

    /// Identity of the currently-executing entry, if any.
    pub(crate) fn current(&self) -> Option<String> {
        self.executing.lock().clone()
    }

    pub(crate) fn pop_head(&self) -> Option<QueueEntry> {
        self.queue.lock().pop_front()
    }

    /// Remove the leading `count` tasks claimed by a batch plan.
    pub(crate) fn pop_task_prefix(&self, count: usize) -> Vec<Task> {
        let mut queue = self.queue.lock();
        let mut tasks = Vec::with_capacity(count);
        for _ in 0..count {
            match queue.pop_front() {
                Some(QueueEntry::Task(task)) => tasks.push(task),
                // Plans only ever claim task prefixes; put anything else back.
                Some(entry) => {
                    queue.push_front(entry);
                    break;
                }
                None => break,
            }
        }
        tasks
    }

    /// Offer the current queue prefix to the registered batchers.
    pub(crate) fn plan(&self, batchers: &mut [Box<dyn Batcher>]) -> Option<BatchPlan> {
        let queue = self.queue.lock();
        plan_batch(&queue, batchers)
    }

    /// Re-arm the idle signal if the queue is still empty. Returns `false`
    /// when a new entry slipped in and draining must continue.
    pub(crate) fn try_set_idle(&self) -> bool {
        let queue = self.queue.lock();
        if queue.is_empty() {
            self.idle.send_replace(true);
            true
        } else {
            false
        }
    }

    pub(crate) fn set_executing(&self, identity: String) {
        *self.executing.lock() = Some(identity);
    }

    pub(crate) fn clear_executing(&self) {
        *self.executing.lock() = None;
    }

    /// Drop every queued entry, returning the dropped identities.
    pub(crate) fn clear_queue(&self) -> Vec<String> {
        let mut queue = self.queue.lock();
        let dropped = queue.iter().map(QueueEntry::identity).collect();
        queue.clear();
        dropped
    }

    /// Run one entry with the executing marker held.
    pub(crate) async fn execute_entry(&self, entry: QueueEntry) -> Result<(), FaultEvent> {
        self.set_executing(entry.identity());
        let result = match entry {
            QueueEntry::Task(task) => task.execute().await,
            QueueEntry::Syncer(syncer) => {
                syncer.execute().await;
                Ok(())
            }
        };
        self.clear_executing();
        result
    }

    /// Drop the remaining queue, then let the fault continue upward.
    ///
    /// Once an error survives task-level handling the runner abandons
    /// pending work rather than attempt it against possibly-inconsistent
    /// remote state.
    pub(crate) async fn abandon_and_raise(&self, event: FaultEvent) {
        let dropped = self.clear_queue();
        if !dropped.is_empty() {
            tracing::warn!(
                runner = %self.label,
                dropped = ?dropped,
                "dropping queued work after failure"
            );
        }
        self.faults.raise(event).await;
    }

    /// Suspend until the queue has drained to empty, bounded by `timeout`.
    ///
    /// On timeout the queue contents and the executing entry are logged, a
    /// non-fatal [`FaultKind::Timeout`] event is raised, and the call
    /// returns normally.
    pub(crate) async fn wait_till_closeout(&self, timeout: Duration) -> Closeout {
        let mut idle = self.idle.subscribe();
        match tokio::time::timeout(timeout, idle.wait_for(|done| *done)).await {
            Ok(_) => Closeout::Drained,
            Err(_) => {
                let executing = self.current();
                let pending = self.queued();
                tracing::warn!(
                    runner = %self.label,
                    executing = ?executing,
                    pending = ?pending,
                    "closeout wait timed out"
                );
                let event = FaultEvent::runner(
                    self.label.clone(),
                    FaultKind::Timeout,
                    CauseChain::msg("closeout wait timed out"),
                )
                .with_context(serde_json::json!({
                    "executing": executing,
                    "pending": pending,
                    "timeout_ms": timeout.as_millis() as u64,
                }));
                self.faults.raise(event).await;
                Closeout::TimedOut { executing, pending }
            }
        }
    }
}

/// Handle to a runner's worker loop.
pub(crate) struct WorkerState {
    pub(crate) shutdown_tx: oneshot::Sender<()>,
    pub(crate) handle: JoinHandle<()>,
}

/// Cancel the worker after a closeout attempt.
///
/// A drained worker is stopped cooperatively; a timed-out one is aborted
/// mid-entry. Entries still queued afterwards are reported as abandoned —
/// a cancelled loop does not execute them.
pub(crate) async fn close_worker(core: &RunnerCore, state: Option<WorkerState>, outcome: &Closeout) {
    if let Some(state) = state {
        if outcome.is_drained() {
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        } else {
            state.handle.abort();
        }
    }
    let abandoned = core.clear_queue();
    if !abandoned.is_empty() {
        let event = FaultEvent::runner(
            core.label().to_string(),
            FaultKind::Cancelled,
            CauseChain::msg("runner closed with entries still queued"),
        )
        .with_context(serde_json::json!({ "abandoned": abandoned }));
        core.faults().raise(event).await;
    }
}
