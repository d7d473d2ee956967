use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task;

use super::core::{RunnerCore, WorkerState, close_worker};
use super::{Closeout, QueueEntry};
use crate::faults::FaultHub;
use crate::syncers::Syncer;
use crate::task::Task;

/// A FIFO queue executed strictly in order, one entry at a time.
///
/// Created per synchronized entity; the worker task is spawned on
/// construction and lives until [`close`](Self::close) (or drop). A later
/// [`run`](Self::run) call only ever observes FIFO order relative to
/// earlier `run`/`sync` calls on the same runner.
///
/// # Examples
///
/// ```no_run
/// use syncline::runners::{DEFAULT_CLOSEOUT_TIMEOUT, OrderedRunner};
/// use syncline::task::{Task, TaskName};
///
/// # async fn demo() {
/// let runner = OrderedRunner::new("shape-17");
/// runner.run(Task::new(
///     TaskName::new("shape", "set_property"),
///     vec![serde_json::json!("X"), serde_json::json!(1)],
///     || async { Ok(()) },
/// ));
/// runner.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;
/// # }
/// ```
pub struct OrderedRunner {
    core: Arc<RunnerCore>,
    worker: Mutex<Option<WorkerState>>,
}

impl OrderedRunner {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let faults = FaultHub::labeled(format!("runner:{label}"));
        let core = RunnerCore::new(label, faults);
        let worker = Mutex::new(Some(spawn_worker(core.clone())));
        Self { core, worker }
    }

    /// Create a runner whose fault hub is adopted by `parent`.
    pub fn with_faults(label: impl Into<String>, parent: &FaultHub) -> Self {
        let runner = Self::new(label);
        parent.adopt(runner.faults());
        runner
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

    /// Append a barrier; it is awaited exactly like a task.
    pub fn sync(&self, syncer: impl Into<Syncer>) {
        self.core.enqueue(QueueEntry::Syncer(syncer.into()));
    }

    /// Identities of all not-yet-started entries.
    #[must_use]
    pub fn queued(&self) -> Vec<String> {
        self.core.queued()
    }

    /// Identity of the currently-executing entry, if any.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.core.current()
    }

    /// Suspend until the queue drains; on timeout, log and report the
    /// stuck entries and return. Diagnostic wait, not a commitment.
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

impl Drop for OrderedRunner {
    fn drop(&mut self) {
        if let Some(state) = self.worker.lock().take() {
            let _ = state.shutdown_tx.send(());
            state.handle.abort();
        }
    }
}

fn spawn_worker(core: Arc<RunnerCore>) -> WorkerState {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let handle = task::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = core.work_pending() => drain(&core).await,
            }
        }
    });
    WorkerState {
        shutdown_tx,
        handle,
    }
}

/// Pop and execute head entries until the queue is empty, then re-arm idle.
async fn drain(core: &Arc<RunnerCore>) {
    loop {
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
