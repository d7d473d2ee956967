//! Full-stack scenario: a document entity batching property writes into a
//! single combined remote call, with faults surfacing at the document
//! layer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use syncline::batchers::EqualityBatcher;
use syncline::faults::FaultHub;
use syncline::runners::{Closeout, DocumentId, RunnerRegistry};
use syncline::syncers::BlockSyncer;
use syncline::task::{Task, TaskName};

mod common;
use common::OpLog;

/// Order-stable last-write-wins property cache, as a remote sync layer
/// would keep between flushes.
#[derive(Clone, Default)]
struct PropertyCache {
    entries: Arc<Mutex<Vec<(String, i64)>>>,
}

impl PropertyCache {
    fn set(&self, key: &str, value: i64) {
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key.to_string(), value)),
        }
    }

    fn take(&self) -> Vec<(String, i64)> {
        std::mem::take(&mut self.entries.lock())
    }
}

fn set_property(cache: &PropertyCache, key: &'static str, value: i64) -> Task {
    let cache = cache.clone();
    Task::new(
        TaskName::new("object", "set_property"),
        vec![serde_json::json!({ "key": key, "value": value })],
        move || async move {
            cache.set(key, value);
            Ok(())
        },
    )
}

#[tokio::test]
async fn adjacent_property_writes_flush_as_one_combined_call() {
    let registry = RunnerRegistry::new(FaultHub::labeled("document-layer"));
    let doc = DocumentId::new("doc-1");
    let object = registry.adapter_for(&doc, "object-1");

    let cache = PropertyCache::default();
    let flushes: Arc<Mutex<Vec<Vec<(String, i64)>>>> = Arc::default();

    let flush_cache = cache.clone();
    let flush_log = flushes.clone();
    registry
        .runner_for(&doc)
        .register_batcher(Box::new(EqualityBatcher::new(
            TaskName::new("object", "set_property"),
            move || {
                let cache = flush_cache.clone();
                let log = flush_log.clone();
                async move {
                    log.lock().push(cache.take());
                    Ok(())
                }
            },
        )))
        .await;

    // Stage all three writes behind a gate so they coalesce into one
    // batch; X is written twice, last write wins.
    let gate = BlockSyncer::new();
    object.sync(gate.clone());
    object.run(set_property(&cache, "X", 1));
    object.run(set_property(&cache, "Y", 2));
    object.run(set_property(&cache, "X", 3));
    gate.restart();

    let outcome = object.wait_till_closeout(Duration::from_secs(1)).await;
    assert_eq!(outcome, Closeout::Drained);
    assert!(object.queued().is_empty());

    let flushes = flushes.lock();
    assert_eq!(flushes.len(), 1, "one combined remote call");
    assert_eq!(
        flushes[0],
        vec![("X".to_string(), 3), ("Y".to_string(), 2)]
    );
}

#[tokio::test]
async fn mixed_workload_keeps_whole_document_order() {
    let registry = RunnerRegistry::new(FaultHub::labeled("document-layer"));
    let doc = DocumentId::new("doc-1");
    let shape = registry.adapter_for(&doc, "shape-1");
    let label = registry.adapter_for(&doc, "label-1");

    let log = OpLog::new();
    let cache = PropertyCache::default();

    let flush_cache = cache.clone();
    let flush_log = log.clone();
    registry
        .runner_for(&doc)
        .register_batcher(Box::new(EqualityBatcher::new(
            TaskName::new("object", "set_property"),
            move || {
                let cache = flush_cache.clone();
                let log = flush_log.clone();
                async move {
                    let n = cache.take().len();
                    log.record(format!("flush({n})"));
                    Ok(())
                }
            },
        )))
        .await;

    let gate = BlockSyncer::new();
    shape.sync(gate.clone());
    shape.run(set_property(&cache, "X", 1));
    shape.run(set_property(&cache, "Y", 2));
    label.run({
        let log = log.clone();
        Task::new(TaskName::new("label", "set_text"), vec![], move || {
            async move {
                log.record("set_text");
                Ok(())
            }
        })
    });
    shape.run(set_property(&cache, "Z", 4));
    gate.restart();

    shape.wait_till_closeout(Duration::from_secs(1)).await;

    // The label write fences the property run: two flushes, in order.
    assert_eq!(log.entries(), vec!["flush(2)", "set_text", "flush(1)"]);

    let outcome = registry.remove(&doc, Duration::from_secs(1)).await;
    assert_eq!(outcome, Some(Closeout::Drained));
    assert!(registry.is_empty());
}
