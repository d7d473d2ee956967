//! # Syncline: Ordered Execution & Synchronization Engine
//!
//! Syncline keeps a set of independently-mutating collaborative objects
//! consistent while their changes are relayed, one at a time, to a remote
//! synchronization node — without losing event ordering and without
//! blocking unrelated objects more than necessary.
//!
//! ## Core Concepts
//!
//! - **Tasks**: one enqueued operation plus arguments and a stable identity
//! - **Runners**: per-entity FIFO queues, each drained by one worker task
//! - **Batchers**: coalesce adjacent homogeneous tasks into one remote call
//! - **Syncers**: barrier primitives enqueued like tasks to impose
//!   cross-queue ordering (creation, removal, whole-document recompute)
//! - **Fault chain**: parent/child propagation tree with per-kind recovery
//!
//! ## Quick Start
//!
//! ### Enqueueing work on a runner
//!
//! ```no_run
//! use syncline::runners::{DEFAULT_CLOSEOUT_TIMEOUT, OrderedRunner};
//! use syncline::task::{Task, TaskName};
//!
//! # async fn example() {
//! let runner = OrderedRunner::new("shape-17");
//!
//! runner.run(Task::new(
//!     TaskName::new("shape", "set_property"),
//!     vec![serde_json::json!("X"), serde_json::json!(1)],
//!     || async {
//!         // issue the remote call here
//!         Ok(())
//!     },
//! ));
//!
//! // Submission order is execution order, unconditionally.
//! runner.wait_till_closeout(DEFAULT_CLOSEOUT_TIMEOUT).await;
//! # }
//! ```
//!
//! ### Coalescing adjacent operations
//!
//! ```no_run
//! use syncline::batchers::EqualityBatcher;
//! use syncline::runners::BatchedOrderedRunner;
//! use syncline::task::TaskName;
//!
//! # async fn example() {
//! let runner = BatchedOrderedRunner::new("shape-17");
//! runner
//!     .register_batcher(Box::new(EqualityBatcher::new(
//!         TaskName::new("shape", "set_property"),
//!         || async {
//!             // flush the accumulated property cache as one remote call
//!             Ok(())
//!         },
//!     )))
//!     .await;
//! # }
//! ```
//!
//! ### Cross-runner barriers
//!
//! ```no_run
//! use std::time::Duration;
//! use syncline::runners::OrderedRunner;
//! use syncline::syncers::AcknowledgeBlockSyncer;
//!
//! # async fn example(runners: Vec<OrderedRunner>) -> Result<(), Box<dyn std::error::Error>> {
//! // Hold every other entity's runner until a new object finishes setup.
//! let barrier = AcknowledgeBlockSyncer::new(runners.len());
//! for runner in &runners {
//!     runner.sync(barrier.clone());
//! }
//! barrier.wait_acknowledged(Duration::from_secs(60)).await?;
//! // ... perform the structural change ...
//! barrier.restart();
//! # Ok(())
//! # }
//! ```
//!
//! ### Observing failures
//!
//! A task never lets a raw failure escape: it is converted at the task
//! boundary into a classified fault event, and a runner that observes one
//! drops its remaining queue before the event continues up the chain.
//!
//! ```no_run
//! use syncline::faults::FaultHub;
//! use syncline::runners::OrderedRunner;
//!
//! # fn example() {
//! let document = FaultHub::labeled("document");
//! let faults = document.subscribe();
//! let runner = OrderedRunner::with_faults("shape-17", &document);
//! // faults.recv_async() now yields anything the runner cannot recover.
//! # let _ = (faults, runner);
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`task`] - Task identity and execution boundary
//! - [`runners`] - Ordered/batched queues, document adapter, registry
//! - [`batchers`] - Claim-and-coalesce strategies
//! - [`syncers`] - Acknowledge/block barrier primitives
//! - [`faults`] - Fault classification, recovery, propagation chain
//! - [`telemetry`] - Tracing subscriber setup

pub mod batchers;
pub mod faults;
pub mod runners;
pub mod syncers;
pub mod task;
pub mod telemetry;
