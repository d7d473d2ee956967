use async_trait::async_trait;

use super::{BatchHandler, Batcher};
use crate::faults::{CauseChain, FaultEvent};
use crate::task::{Task, TaskFailure, TaskName};

/// Claims every leading task whose identity equals one configured name.
///
/// On execution the claimed tasks run first, in submission order — their
/// side effects typically fill a shared cache — and only then the handler
/// runs once, flushing the accumulated cache as a single combined remote
/// operation.
///
/// # Examples
///
/// ```no_run
/// use syncline::batchers::EqualityBatcher;
/// use syncline::task::TaskName;
///
/// let batcher = EqualityBatcher::new(TaskName::new("shape", "set_property"), || async {
///     // one combined remote call for all coalesced set_property tasks
///     Ok(())
/// });
/// ```
pub struct EqualityBatcher {
    name: TaskName,
    handler: BatchHandler,
    claimed: usize,
}

impl EqualityBatcher {
    pub fn new<F, Fut>(name: TaskName, handler: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), TaskFailure>> + Send + 'static,
    {
        let mut handler = handler;
        Self {
            name,
            handler: Box::new(move || Box::pin(handler())),
            claimed: 0,
        }
    }

    #[must_use]
    pub fn name(&self) -> &TaskName {
        &self.name
    }
}

#[async_trait]
impl Batcher for EqualityBatcher {
    fn start_batching(&mut self) {
        self.claimed = 0;
    }

    fn offer(&mut self, task: &Task) -> bool {
        if task.name() == &self.name {
            self.claimed += 1;
            true
        } else {
            false
        }
    }

    fn claimed(&self) -> usize {
        self.claimed
    }

    async fn execute(&mut self, tasks: Vec<Task>) -> Result<(), FaultEvent> {
        let coalesced = tasks.len();
        tracing::debug!(operation = %self.name, coalesced, "executing batch");
        for task in tasks {
            task.execute().await?;
        }
        (self.handler)().await.map_err(|failure| {
            FaultEvent::batcher(self.name.encode(), CauseChain::msg(failure.to_string()))
                .with_context(serde_json::json!({
                    "operation": self.name.encode(),
                    "coalesced": coalesced,
                }))
        })
    }

    fn done_batching(&mut self) {
        self.claimed = 0;
    }
}
