use std::time::Duration;

use syncline::faults::{FaultKind, FaultSource};
use syncline::runners::{Closeout, DEFAULT_CLOSEOUT_TIMEOUT, OrderedRunner};
use syncline::task::TaskName;

mod common;
use common::*;

#[tokio::test]
async fn fifo_order_is_execution_order() {
    let log = OpLog::new();
    let runner = OrderedRunner::new("shape-1");

    for i in 0..5 {
        runner.run(recording_task(
            &log,
            TaskName::new("shape", format!("op{i}")),
            &format!("op{i}"),
        ));
    }

    let outcome = runner.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;
    assert_eq!(outcome, Closeout::Drained);
    assert_eq!(log.entries(), vec!["op0", "op1", "op2", "op3", "op4"]);
}

#[tokio::test]
async fn error_clears_remaining_queue() {
    let log = OpLog::new();
    let runner = OrderedRunner::new("shape-2");
    let faults = runner.faults().subscribe();

    runner.run(recording_task(&log, prop_name(), "first"));
    runner.run(failing_task(TaskName::new("shape", "explode"), "remote rejected"));
    runner.run(recording_task(&log, prop_name(), "third"));

    let outcome = runner.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;
    assert_eq!(outcome, Closeout::Drained);

    // The third task never ran.
    assert_eq!(log.entries(), vec!["first"]);

    // Exactly one event for the failure.
    let event = faults.try_recv().expect("one fault expected");
    assert_eq!(event.kind, FaultKind::OperationFailed);
    assert_eq!(
        event.source,
        FaultSource::Task {
            name: "shape.explode".to_string()
        }
    );
    assert_eq!(event.error.message, "remote rejected");
    assert!(faults.try_recv().is_err(), "expected no further events");
}

#[tokio::test]
async fn runner_keeps_accepting_work_after_error() {
    let log = OpLog::new();
    let runner = OrderedRunner::new("shape-3");
    let _faults = runner.faults().subscribe();

    runner.run(failing_task(prop_name(), "boom"));
    runner.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;

    runner.run(recording_task(&log, prop_name(), "after"));
    runner.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;
    assert_eq!(log.entries(), vec!["after"]);
}

#[tokio::test]
async fn closeout_timeout_is_non_fatal_and_reports_pending() {
    let log = OpLog::new();
    let runner = OrderedRunner::new("shape-4");
    let faults = runner.faults().subscribe();

    runner.run(slow_task(&log, prop_name(), "slow", Duration::from_secs(5)));
    runner.run(recording_task(&log, status_name(), "queued"));

    let outcome = runner.wait_till_closeout(Duration::from_millis(20)).await;
    match outcome {
        Closeout::TimedOut { executing, pending } => {
            assert_eq!(executing.as_deref(), Some("object.set_property"));
            assert_eq!(pending, vec!["object.set_status".to_string()]);
        }
        Closeout::Drained => panic!("expected timeout"),
    }

    let event = faults.recv_async().await.expect("timeout fault expected");
    assert_eq!(event.kind, FaultKind::Timeout);
    assert_eq!(
        event.context["pending"],
        serde_json::json!(["object.set_status"])
    );
}

#[tokio::test]
async fn queued_reports_not_yet_started_entries() {
    let log = OpLog::new();
    let runner = OrderedRunner::new("shape-5");

    runner.run(slow_task(&log, prop_name(), "slow", Duration::from_millis(200)));
    runner.run(recording_task(&log, status_name(), "second"));
    runner.run(recording_task(&log, prop_name(), "third"));

    // Give the worker a moment to start the slow head entry.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(runner.current().as_deref(), Some("object.set_property"));
    assert_eq!(
        runner.queued(),
        vec![
            "object.set_status".to_string(),
            "object.set_property".to_string()
        ]
    );

    runner.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;
    assert!(runner.queued().is_empty());
}

#[tokio::test]
async fn close_drains_then_cancels() {
    let log = OpLog::new();
    let runner = OrderedRunner::new("shape-6");

    runner.run(recording_task(&log, prop_name(), "only"));
    let outcome = runner.close(DEFAULT_CLOSEOUT_TIMEOUT).await;
    assert_eq!(outcome, Closeout::Drained);
    assert_eq!(log.entries(), vec!["only"]);
}

#[tokio::test]
async fn timed_out_close_abandons_queue_as_cancelled() {
    let log = OpLog::new();
    let runner = OrderedRunner::new("shape-7");
    let faults = runner.faults().subscribe();

    runner.run(slow_task(&log, prop_name(), "slow", Duration::from_secs(5)));
    runner.run(recording_task(&log, status_name(), "never"));

    let outcome = runner.close(Duration::from_millis(20)).await;
    assert!(!outcome.is_drained());
    assert!(runner.queued().is_empty());
    assert!(!log.contains("never"));

    // Timeout from the drain wait, then the cancellation report.
    let first = faults.recv_async().await.expect("timeout fault");
    assert_eq!(first.kind, FaultKind::Timeout);
    let second = faults.recv_async().await.expect("cancellation fault");
    assert_eq!(second.kind, FaultKind::Cancelled);
    assert_eq!(
        second.context["abandoned"],
        serde_json::json!(["object.set_status"])
    );
}
