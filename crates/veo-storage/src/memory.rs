//! In-memory snapshot store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};
use crate::store::{Slot, SnapshotStore};

/// Volatile store. Can be switched into a failing mode to simulate a lost
/// persistence layer.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<Slot, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("memory store is in failing mode"));
        }
        Ok(())
    }

    fn slots(&self) -> StorageResult<std::sync::MutexGuard<'_, HashMap<Slot, Vec<u8>>>> {
        self.slots
            .lock()
            .map_err(|_| StorageError::unavailable("memory store lock poisoned"))
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save(&self, slot: Slot, bytes: &[u8]) -> StorageResult<()> {
        self.check()?;
        self.slots()?.insert(slot, bytes.to_vec());
        Ok(())
    }

    async fn load(&self, slot: Slot) -> StorageResult<Option<Vec<u8>>> {
        self.check()?;
        Ok(self.slots()?.get(&slot).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failing_mode() {
        let store = MemoryStore::new();
        store.save(Slot::Queue, b"x").await.unwrap();

        store.set_failing(true);
        assert!(store.save(Slot::Queue, b"y").await.is_err());
        assert!(store.load(Slot::Queue).await.is_err());

        store.set_failing(false);
        assert_eq!(store.load(Slot::Queue).await.unwrap().unwrap(), b"x");
    }
}
