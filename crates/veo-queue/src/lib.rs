//! Sequential job queue for video generation.
//!
//! This crate provides:
//! - The ordered job store with snapshot/restore
//! - The output naming policy
//! - The queue engine that drives one job at a time through
//!   submit, poll, fetch and export
//! - Notifier and event types for surfacing progress

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod naming;
pub mod notifier;
pub mod store;

pub use config::EngineConfig;
pub use engine::{HaltReason, QueueEngine, RunOutcome};
pub use error::{QueueError, QueueResult};
pub use events::{QueueEvent, QueueStats};
pub use logging::JobLogger;
pub use naming::compute_filename;
pub use notifier::{Notifier, TracingNotifier};
pub use store::JobStore;
