//! Task primitives for the syncline execution engine.
//!
//! A [`Task`] wraps one operation destined for the remote synchronization
//! node: an async closure, a snapshot of its arguments for diagnostics, and
//! a deterministic [`TaskName`] identity used by batchers to group adjacent
//! homogeneous operations and by stuck-queue diagnostics.

use std::fmt;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::faults::{CauseChain, FaultEvent};

/// Boxed failure produced by a task operation or a batch flush handler.
pub type TaskFailure = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by a task operation.
pub type TaskFuture = BoxFuture<'static, Result<(), TaskFailure>>;

pub(crate) type TaskOp = Box<dyn FnOnce() -> TaskFuture + Send>;

/// Stable identity of an enqueued operation.
///
/// Derived from the owning object and the operation name, never from
/// argument values, so that every enqueue of the same logical operation
/// carries the same identity regardless of payload.
///
/// # Examples
///
/// ```rust
/// use syncline::task::TaskName;
///
/// let name = TaskName::new("shape", "set_property");
/// assert_eq!(name.encode(), "shape.set_property");
/// assert_eq!(name, TaskName::new("shape", "set_property"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskName {
    /// Owning object of the operation (entity type or instance label).
    pub owner: String,
    /// Operation name on that owner.
    pub op: String,
}

impl TaskName {
    pub fn new(owner: impl Into<String>, op: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            op: op.into(),
        }
    }

    /// Encode the identity into its diagnostic string form (`owner.op`).
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}.{}", self.owner, self.op)
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.op)
    }
}

/// One enqueued operation plus its arguments.
///
/// Immutable once created and consumed by execution. The wrapped closure
/// captures everything it needs (including the remote call it will issue);
/// the `args` snapshot exists purely for diagnostics and fault context.
pub struct Task {
    name: TaskName,
    args: Vec<serde_json::Value>,
    op: TaskOp,
}

impl Task {
    /// Wrap an async operation into a task.
    pub fn new<F, Fut>(name: TaskName, args: Vec<serde_json::Value>, op: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), TaskFailure>> + Send + 'static,
    {
        Self {
            name,
            args,
            op: Box::new(move || Box::pin(op())),
        }
    }

    pub(crate) fn from_parts(name: TaskName, args: Vec<serde_json::Value>, op: TaskOp) -> Self {
        Self { name, args, op }
    }

    pub(crate) fn into_parts(self) -> (TaskName, Vec<serde_json::Value>, TaskOp) {
        (self.name, self.args, self.op)
    }

    #[must_use]
    pub fn name(&self) -> &TaskName {
        &self.name
    }

    #[must_use]
    pub fn args(&self) -> &[serde_json::Value] {
        &self.args
    }

    /// Run the wrapped operation to completion.
    ///
    /// A raw failure never escapes this boundary: any error from the
    /// operation is converted into an [`FaultEvent`] classified as
    /// [`FaultKind::OperationFailed`](crate::faults::FaultKind::OperationFailed)
    /// with the identity and argument snapshot attached as context.
    pub async fn execute(self) -> Result<(), FaultEvent> {
        let Task { name, args, op } = self;
        tracing::debug!(task = %name, "executing task");
        match op().await {
            Ok(()) => Ok(()),
            Err(failure) => {
                let event = FaultEvent::task(name.encode(), CauseChain::msg(failure.to_string()))
                    .with_context(serde_json::json!({
                        "task": name.encode(),
                        "args": args,
                    }));
                Err(event)
            }
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
