use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{BatchedOrderedRunner, Closeout, DocumentRunner};
use crate::faults::FaultHub;

/// Identifier of one synchronized document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Explicit registry of shared per-document runners.
///
/// Passed to entities at construction so multiple entities can be handed
/// the same physical queue without hidden process-wide state; teardown
/// order is explicit via [`remove`](Self::remove) on document close.
///
/// # Examples
///
/// ```no_run
/// use syncline::faults::FaultHub;
/// use syncline::runners::{DocumentId, RunnerRegistry};
///
/// # async fn demo() {
/// let registry = RunnerRegistry::new(FaultHub::labeled("document-layer"));
/// let doc = DocumentId::new("doc-42");
/// let shape = registry.adapter_for(&doc, "shape-17");
/// let label = registry.adapter_for(&doc, "label-3");
/// // Both facades feed the same physical queue.
/// # let _ = (shape, label);
/// # }
/// ```
pub struct RunnerRegistry {
    runners: Mutex<FxHashMap<DocumentId, Arc<BatchedOrderedRunner>>>,
    faults: FaultHub,
}

impl RunnerRegistry {
    pub fn new(faults: FaultHub) -> Self {
        Self {
            runners: Mutex::new(FxHashMap::default()),
            faults,
        }
    }

    #[must_use]
    pub fn faults(&self) -> &FaultHub {
        &self.faults
    }

    /// The shared runner for `doc`, created on first request.
    ///
    /// New runners are adopted into the registry's fault hub so their
    /// failures surface through the document layer.
    pub fn runner_for(&self, doc: &DocumentId) -> Arc<BatchedOrderedRunner> {
        let mut runners = self.runners.lock();
        runners
            .entry(doc.clone())
            .or_insert_with(|| {
                tracing::debug!(document = %doc, "creating shared document runner");
                Arc::new(BatchedOrderedRunner::with_faults(
                    format!("document:{doc}"),
                    &self.faults,
                ))
            })
            .clone()
    }

    /// A per-entity facade over the document's shared queue.
    pub fn adapter_for(&self, doc: &DocumentId, entity: impl Into<String>) -> DocumentRunner {
        DocumentRunner::new(entity, self.runner_for(doc))
    }

    /// Close and discard the document's shared runner.
    ///
    /// Returns `None` when the document has no runner. The runner is
    /// removed from the fault chain after closing so late diagnostics
    /// still propagate.
    pub async fn remove(&self, doc: &DocumentId, timeout: Duration) -> Option<Closeout> {
        let runner = self.runners.lock().remove(doc)?;
        let outcome = runner.close(timeout).await;
        self.faults.disown(runner.faults());
        tracing::debug!(document = %doc, drained = outcome.is_drained(), "document runner removed");
        Some(outcome)
    }

    #[must_use]
    pub fn contains(&self, doc: &DocumentId) -> bool {
        self.runners.lock().contains_key(doc)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.runners.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runners.lock().is_empty()
    }
}
