use std::time::Duration;

use syncline::runners::{DEFAULT_CLOSEOUT_TIMEOUT, OrderedRunner};
use syncline::syncers::{
    AcknowledgeBlockSyncer, AcknowledgeSyncer, BlockSyncer, RestartBlockSyncer, SyncerError,
};
use syncline::task::TaskName;

mod common;
use common::*;

#[tokio::test]
async fn acknowledge_barrier_waits_for_every_runner() {
    let log = OpLog::new();
    let ack = AcknowledgeSyncer::new(3);
    let runners: Vec<OrderedRunner> = (0..3)
        .map(|i| OrderedRunner::new(format!("entity-{i}")))
        .collect();

    for (i, runner) in runners.iter().enumerate() {
        runner.run(slow_task(
            &log,
            TaskName::new("entity", format!("op{i}")),
            &format!("op{i}"),
            Duration::from_millis(30 * (i as u64 + 1)),
        ));
        runner.sync(ack.clone());
    }

    // Too early: not all runners have reached the barrier yet.
    let early = ack.wait_acknowledged(Duration::from_millis(5)).await;
    assert!(matches!(early, Err(SyncerError::Timeout { .. })));

    ack.wait_acknowledged(Duration::from_secs(2))
        .await
        .expect("all runners reach the barrier");
    assert_eq!(ack.remaining(), 0);
    assert_eq!(log.entries().len(), 3);
}

#[tokio::test]
async fn acknowledge_past_zero_saturates() {
    let ack = AcknowledgeSyncer::new(1);
    ack.acknowledge();
    ack.acknowledge();
    ack.acknowledge();
    assert_eq!(ack.remaining(), 0);
    ack.acknowledged().await;
}

#[tokio::test]
async fn block_holds_runner_until_restarted() {
    let log = OpLog::new();
    let runner = OrderedRunner::new("held");
    let gate = BlockSyncer::new();

    runner.run(recording_task(&log, prop_name(), "before"));
    runner.sync(gate.clone());
    runner.run(recording_task(&log, prop_name(), "after"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(log.entries(), vec!["before"]);
    assert!(!gate.is_open());

    gate.restart();
    runner.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;
    assert_eq!(log.entries(), vec!["before", "after"]);
}

#[tokio::test]
async fn restart_block_releases_another_runners_gate() {
    let log = OpLog::new();
    let held = OrderedRunner::new("held");
    let releaser = OrderedRunner::new("releaser");
    let gate = BlockSyncer::new();

    held.sync(gate.clone());
    held.run(recording_task(&log, prop_name(), "held_work"));

    releaser.run(recording_task(&log, status_name(), "release_prep"));
    releaser.sync(RestartBlockSyncer::new(gate.clone()));

    held.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;
    releaser.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;

    assert!(gate.is_open());
    assert_eq!(log.entries(), vec!["release_prep", "held_work"]);
}

#[tokio::test]
async fn acknowledge_block_holds_all_runners_through_setup() {
    let log = OpLog::new();
    let barrier = AcknowledgeBlockSyncer::new(2);
    let runners = [OrderedRunner::new("a"), OrderedRunner::new("b")];

    for (i, runner) in runners.iter().enumerate() {
        runner.sync(barrier.clone());
        runner.run(recording_task(
            &log,
            prop_name(),
            &format!("resumed_{i}"),
        ));
    }

    barrier
        .wait_acknowledged(Duration::from_secs(2))
        .await
        .expect("both runners acknowledge");
    // Both runners are parked on the gate; neither has resumed.
    assert!(log.entries().is_empty());

    log.record("setup_done");
    barrier.restart();

    for runner in &runners {
        runner.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;
    }
    let entries = log.entries();
    assert_eq!(entries[0], "setup_done");
    assert!(entries.contains(&"resumed_0".to_string()));
    assert!(entries.contains(&"resumed_1".to_string()));
}

#[tokio::test]
async fn open_gate_passes_late_arrivals_through() {
    let log = OpLog::new();
    let runner = OrderedRunner::new("late");
    let gate = BlockSyncer::new();
    gate.restart();

    runner.sync(gate);
    runner.run(recording_task(&log, prop_name(), "through"));

    runner.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;
    assert_eq!(log.entries(), vec!["through"]);
}
