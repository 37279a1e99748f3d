//! Command-line front end for the video generation queue.
//!
//! This crate provides:
//! - Environment-driven configuration
//! - The clap command tree
//! - Handlers that drive the queue engine and preferences
//! - A data directory lock shared by concurrent invocations

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod lock;

pub use cli::{Cli, Commands};
pub use commands::App;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use lock::DataDirLock;
