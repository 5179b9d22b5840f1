//! Concurrent transfer engine for ferry.
//!
//! # Architecture
//!
//! - **Orchestrator**: filters already-verified requests against the state
//!   store, dispatches the rest through a bounded worker pool, aggregates
//!   outcomes, and persists one record per attempt
//! - **Worker**: drives one external agent process per request with
//!   cooperative cancellation and a per-worker log artifact
//! - **Progress channel**: single ordered pipe all workers report through,
//!   drained by one reporter task so lines never interleave
//! - **State store**: crash-tolerant JSON snapshot with periodic backup
//!
//! # Concurrency Model
//!
//! - One semaphore bounds active agent processes; task spawning is cheap
//! - The cancellation token is the only cross-cutting flag; it is set once
//!   and never reset within a run
//! - All snapshot mutation is serialized by the store's single lock,
//!   regardless of transfer concurrency

pub mod agents;
pub mod orchestrator;
pub mod progress;
pub mod state;
pub mod verify;
pub mod worker;

pub use agents::{Aria2Agent, LftpAgent};
pub use orchestrator::TransferOrchestrator;
pub use progress::ProgressSender;
pub use state::StateStore;
pub use verify::{VerifyReport, verify_checksums};
pub use worker::WorkerContext;
