//! Coalescing of adjacent homogeneous tasks into fewer remote calls.
//!
//! A [`Batcher`] is consulted by a
//! [`BatchedOrderedRunner`](crate::runners::BatchedOrderedRunner) before it
//! pops the head of its queue: each registered batcher is offered the
//! leading entries strictly in order and claims as many as it can absorb
//! into one combined operation. Claims are contiguous prefixes only, so
//! batching can never reorder across an entry it did not claim.

pub mod equality;
pub mod multi;

use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

pub use equality::EqualityBatcher;
pub use multi::MultiBatcher;

use crate::faults::FaultEvent;
use crate::runners::QueueEntry;
use crate::task::{Task, TaskFailure};

/// Combined flush invoked once per executed batch.
pub type BatchHandler = Box<dyn FnMut() -> BoxFuture<'static, Result<(), TaskFailure>> + Send>;

/// A component that claims and coalesces contiguous compatible tasks.
///
/// Stateless between batching passes except for the transient claim count,
/// bracketed by [`start_batching`](Self::start_batching) /
/// [`done_batching`](Self::done_batching). Batchers own no tasks while
/// claiming; the runner removes the claimed prefix and hands it over to the
/// winner's [`execute`](Self::execute).
#[async_trait]
pub trait Batcher: Send {
    /// Reset transient claim state for a new batching attempt.
    fn start_batching(&mut self);

    /// Offer the next leading task. Returns `true` to claim it; the first
    /// refusal ends this batcher's run.
    fn offer(&mut self, task: &Task) -> bool;

    /// Number of tasks claimed in the current attempt.
    fn claimed(&self) -> usize;

    /// Run the claimed tasks as one combined operation.
    ///
    /// `tasks` is the claimed prefix in submission order.
    async fn execute(&mut self, tasks: Vec<Task>) -> Result<(), FaultEvent>;

    /// Close the batching bracket opened by `start_batching`.
    fn done_batching(&mut self) {}
}

/// Outcome of one planning pass over the queue prefix.
pub(crate) struct BatchPlan {
    /// Index of the winning batcher in registration order.
    pub winner: usize,
    /// Number of leading tasks it claimed.
    pub count: usize,
}

/// Offer the queue prefix to every batcher and pick the winner.
///
/// Each batcher sees entries from the head forward and stops at its first
/// refusal; syncer entries refuse all batchers. The batcher with the
/// maximum claim wins; ties go to the earliest-registered one. Returns
/// `None` when nothing was claimed.
pub(crate) fn plan_batch(
    entries: &VecDeque<QueueEntry>,
    batchers: &mut [Box<dyn Batcher>],
) -> Option<BatchPlan> {
    let mut best: Option<BatchPlan> = None;
    for (idx, batcher) in batchers.iter_mut().enumerate() {
        batcher.start_batching();
        for entry in entries {
            let QueueEntry::Task(task) = entry else {
                break;
            };
            if !batcher.offer(task) {
                break;
            }
        }
        let count = batcher.claimed();
        if count > 0 && best.as_ref().is_none_or(|plan| count > plan.count) {
            best = Some(BatchPlan { winner: idx, count });
        }
    }
    best
}
