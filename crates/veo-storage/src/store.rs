//! Slot-based snapshot persistence.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Named durable slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Serialized job collection
    Queue,
    /// Naming settings
    NamingSettings,
    /// Stored API key
    Credential,
    /// Export destination
    OutputFolder,
}

impl Slot {
    pub const ALL: &'static [Slot] = &[
        Slot::Queue,
        Slot::NamingSettings,
        Slot::Credential,
        Slot::OutputFolder,
    ];

    /// Stable key used by backends.
    pub fn key(&self) -> &'static str {
        match self {
            Slot::Queue => "video_generation_queue",
            Slot::NamingSettings => "naming_settings",
            Slot::Credential => "api_key",
            Slot::OutputFolder => "output_folder",
        }
    }
}

/// Opaque byte storage keyed by [`Slot`].
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replace the slot contents.
    async fn save(&self, slot: Slot, bytes: &[u8]) -> StorageResult<()>;

    /// Read the slot, `None` if it was never written.
    async fn load(&self, slot: Slot) -> StorageResult<Option<Vec<u8>>>;
}
