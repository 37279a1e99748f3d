//! Durable key/value slots.
//!
//! This crate provides:
//! - The `SnapshotStore` trait over named slots
//! - A file-backed store with atomic replace
//! - An in-memory store
//! - Typed preferences (credential, naming settings, export folder)

pub mod error;
pub mod file;
pub mod memory;
pub mod preferences;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use preferences::Preferences;
pub use store::{Slot, SnapshotStore};
