//! Fault classification and the parent/child error-propagation chain.
//!
//! Every runner, batcher, and document adapter in the engine is also a node
//! in a fault chain: failures are classified into [`FaultEvent`]s at the
//! point they occur, offered to each chain hop's recovery table on the way
//! up, and delivered to the top-level outlet channel if nothing recovers.

pub mod event;
pub mod hub;

pub use event::{CauseChain, FaultEvent, FaultKind, FaultSource};
pub use hub::{FaultHub, RecoveryTask};
