use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::{BatchedOrderedRunner, Closeout};
use crate::faults::FaultHub;
use crate::syncers::Syncer;
use crate::task::{Task, TaskFailure, TaskName};

/// Callback invoked once immediately after a matching task executes.
pub type BatchHook = Arc<dyn Fn() -> BoxFuture<'static, Result<(), TaskFailure>> + Send + Sync>;

/// Per-entity facade over one shared per-document queue.
///
/// When whole-document ordering is required, every entity in the document
/// is handed a `DocumentRunner` over the same physical
/// [`BatchedOrderedRunner`], preserving each entity's public queueing
/// interface while serializing all their changes on one queue. Cloning the
/// facade is how view-provider/decoration objects reuse the owning
/// object's runner, so their changes interleave correctly with the
/// object's own.
///
/// Batchers live on the shared physical queue; what is per-entity here is
/// the batch-hook table: [`register_batch_handler`](Self::register_batch_handler)
/// wraps this entity's own submissions only.
#[derive(Clone)]
pub struct DocumentRunner {
    entity: String,
    shared: Arc<BatchedOrderedRunner>,
    hooks: Arc<Mutex<FxHashMap<TaskName, BatchHook>>>,
}

impl DocumentRunner {
    pub fn new(entity: impl Into<String>, shared: Arc<BatchedOrderedRunner>) -> Self {
        Self {
            entity: entity.into(),
            shared,
            hooks: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    #[must_use]
    pub fn faults(&self) -> &FaultHub {
        self.shared.faults()
    }

    /// Register a hook for one operation name.
    ///
    /// The dispatch table is keyed by [`TaskName`] and populated here, at
    /// registration time; a subsequent [`run`](Self::run) of a matching
    /// task is wrapped so the hook runs once right after the operation
    /// executes (still inside the task's queue slot).
    pub fn register_batch_handler<F, Fut>(&self, name: TaskName, hook: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskFailure>> + Send + 'static,
    {
        let hook: BatchHook = Arc::new(move || Box::pin(hook()));
        self.hooks.lock().insert(name, hook);
    }

    /// Enqueue on the shared queue, wrapping the task if a batch hook is
    /// registered for its name.
    pub fn run(&self, task: Task) {
        let hook = self.hooks.lock().get(task.name()).cloned();
        let task = match hook {
            Some(hook) => wrap_with_hook(task, hook),
            None => task,
        };
        self.shared.run(task);
    }

    /// Append a barrier to the shared queue.
    pub fn sync(&self, syncer: impl Into<Syncer>) {
        self.shared.sync(syncer);
    }

    /// Identities of all not-yet-started entries on the shared queue.
    #[must_use]
    pub fn queued(&self) -> Vec<String> {
        self.shared.queued()
    }

    /// Suspend until the shared queue drains; diagnostic on timeout.
    pub async fn wait_till_closeout(&self, timeout: Duration) -> Closeout {
        self.shared.wait_till_closeout(timeout).await
    }

    /// Drain the shared queue and drop this entity's hooks, leaving the
    /// queue running for the document's other entities. Physical teardown
    /// belongs to [`RunnerRegistry::remove`](super::RunnerRegistry::remove).
    pub async fn detach(&self, timeout: Duration) -> Closeout {
        let outcome = self.shared.wait_till_closeout(timeout).await;
        self.hooks.lock().clear();
        outcome
    }
}

fn wrap_with_hook(task: Task, hook: BatchHook) -> Task {
    let (name, args, op) = task.into_parts();
    Task::from_parts(
        name,
        args,
        Box::new(move || {
            Box::pin(async move {
                op().await?;
                hook().await
            })
        }),
    )
}
