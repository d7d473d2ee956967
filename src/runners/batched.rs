use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task;

use super::core::{RunnerCore, WorkerState, close_worker};
use super::{Closeout, QueueEntry};
use crate::batchers::Batcher;
use crate::faults::FaultHub;
use crate::syncers::Syncer;
use crate::task::Task;

type BatcherSet = Arc<tokio::sync::Mutex<Vec<Box<dyn Batcher>>>>;

/// An [`OrderedRunner`](super::OrderedRunner) variant that coalesces.
///
/// Before popping the head of its queue the worker offers the leading
/// entries to every registered batcher; if a nonzero prefix is claimed it
/// is removed as a unit and the winning batcher's combined `execute` is
/// awaited, otherwise the single head entry runs as an ordinary task.
/// Because batching only ever looks at a contiguous prefix, ordering
/// between operations with different identities is preserved exactly as
/// submitted.
pub struct BatchedOrderedRunner {
    core: Arc<RunnerCore>,
    batchers: BatcherSet,
    worker: Mutex<Option<WorkerState>>,
}

impl BatchedOrderedRunner {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let faults = FaultHub::labeled(format!("runner:{label}"));
        let core = RunnerCore::new(label, faults);
        let batchers: BatcherSet = Arc::new(tokio::sync::Mutex::new(Vec::new()));
        let worker = Mutex::new(Some(spawn_worker(core.clone(), batchers.clone())));
        Self {
            core,
            batchers,
            worker,
        }
    }

    /// Create a runner whose fault hub is adopted by `parent`.
    pub fn with_faults(label: impl Into<String>, parent: &FaultHub) -> Self {
        let runner = Self::new(label);
        parent.adopt(runner.faults());
        runner
    }

    /// Register a batcher. Registration order is the tie-break order when
    /// two batchers claim equally many entries.
    pub async fn register_batcher(&self, batcher: Box<dyn Batcher>) {
        self.batchers.lock().await.push(batcher);
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.core.label()
    }

    #[must_use]
    pub fn faults(&self) -> &FaultHub {
        self.core.faults()
    }

    /// Append a task and signal work pending. Never blocks.
    pub fn run(&self, task: Task) {
        self.core.enqueue(QueueEntry::Task(task));
    }

    /// Append a barrier; it is awaited exactly like a task and stops any
    /// batch claim from reaching past it.
    pub fn sync(&self, syncer: impl Into<Syncer>) {
        self.core.enqueue(QueueEntry::Syncer(syncer.into()));
    }

    /// Identities of all not-yet-started entries.
    #[must_use]
    pub fn queued(&self) -> Vec<String> {
        self.core.queued()
    }

    /// Identity of the currently-executing entry or batch, if any.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.core.current()
    }

    /// Suspend until the queue drains; on timeout, log and report the
    /// stuck entries and return.
    pub async fn wait_till_closeout(&self, timeout: Duration) -> Closeout {
        self.core.wait_till_closeout(timeout).await
    }

    /// Drain (bounded by `timeout`), then cancel the worker loop.
    pub async fn close(&self, timeout: Duration) -> Closeout {
        let outcome = self.core.wait_till_closeout(timeout).await;
        let state = self.worker.lock().take();
        close_worker(&self.core, state, &outcome).await;
        outcome
    }
}

impl Drop for BatchedOrderedRunner {
    fn drop(&mut self) {
        if let Some(state) = self.worker.lock().take() {
            let _ = state.shutdown_tx.send(());
            state.handle.abort();
        }
    }
}

fn spawn_worker(core: Arc<RunnerCore>, batchers: BatcherSet) -> WorkerState {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let handle = task::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = core.work_pending() => drain(&core, &batchers).await,
            }
        }
    });
    WorkerState {
        shutdown_tx,
        handle,
    }
}

async fn drain(core: &Arc<RunnerCore>, batchers: &BatcherSet) {
    let mut batchers = batchers.lock().await;
    loop {
        match core.plan(&mut batchers) {
            Some(plan) => {
                let tasks = core.pop_task_prefix(plan.count);
                let batch_label = tasks
                    .first()
                    .map(|t| format!("batch:{}x{}", t.name().encode(), tasks.len()))
                    .unwrap_or_else(|| "batch:empty".to_string());
                core.set_executing(batch_label);
                let result = batchers[plan.winner].execute(tasks).await;
                for batcher in batchers.iter_mut() {
                    batcher.done_batching();
                }
                core.clear_executing();
                if let Err(event) = result {
                    core.abandon_and_raise(event).await;
                }
            }
            None => {
                for batcher in batchers.iter_mut() {
                    batcher.done_batching();
                }
                match core.pop_head() {
                    Some(entry) => {
                        if let Err(event) = core.execute_entry(entry).await {
                            core.abandon_and_raise(event).await;
                        }
                    }
                    None => {
                        if core.try_set_idle() {
                            break;
                        }
                    }
                }
            }
        }
    }
}
