//! File-backed snapshot store.
//!
//! Each slot is one JSON file under the root directory. Writes go to a
//! temporary sibling first and are renamed into place, so a crash mid-write
//! leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::StorageResult;
use crate::store::{Slot, SnapshotStore};

/// Stores slots as `<root>/<slot>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, slot: Slot) -> PathBuf {
        self.root.join(format!("{}.json", slot.key()))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn save(&self, slot: Slot, bytes: &[u8]) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.path_for(slot);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    async fn load(&self, slot: Slot) -> StorageResult<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(slot)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_replaces_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("state"));

        assert!(store.load(Slot::Queue).await.unwrap().is_none());

        store.save(Slot::Queue, b"[1,2,3]").await.unwrap();
        store.save(Slot::Queue, b"[4]").await.unwrap();
        assert_eq!(store.load(Slot::Queue).await.unwrap().unwrap(), b"[4]");
        assert!(store.load(Slot::NamingSettings).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save(Slot::Credential, b"\"key\"").await.unwrap();

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["api_key.json".to_string()]);
    }
}
