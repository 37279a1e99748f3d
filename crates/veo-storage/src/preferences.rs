//! Typed access to the credential, naming settings and export folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;
use veo_models::{ApiKey, NamingSettings};

use crate::error::{StorageError, StorageResult};
use crate::store::{Slot, SnapshotStore};

/// User preferences persisted through a [`SnapshotStore`].
///
/// Values are read from the store on every call so that the engine always
/// sees the latest configuration at the point of use.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn SnapshotStore>,
    default_output_folder: PathBuf,
    credential_override: Option<ApiKey>,
}

impl Preferences {
    pub fn new(store: Arc<dyn SnapshotStore>, default_output_folder: impl Into<PathBuf>) -> Self {
        Self {
            store,
            default_output_folder: default_output_folder.into(),
            credential_override: None,
        }
    }

    /// Use this key for the session instead of the stored one.
    pub fn with_credential_override(mut self, key: Option<ApiKey>) -> Self {
        self.credential_override = key;
        self
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Current API key, if one is configured and valid.
    pub async fn credential(&self) -> StorageResult<Option<ApiKey>> {
        if let Some(key) = &self.credential_override {
            return Ok(Some(key.clone()));
        }

        let Some(bytes) = self.store.load(Slot::Credential).await? else {
            return Ok(None);
        };
        let raw: String = serde_json::from_slice(&bytes)?;
        match ApiKey::parse(&raw) {
            Ok(key) => Ok(Some(key)),
            Err(e) => {
                warn!("Ignoring stored API key: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn save_credential(&self, key: &ApiKey) -> StorageResult<()> {
        let bytes = serde_json::to_vec(key)?;
        self.store.save(Slot::Credential, &bytes).await
    }

    /// Naming settings, falling back to defaults when unset or unreadable.
    pub async fn naming(&self) -> StorageResult<NamingSettings> {
        let Some(bytes) = self.store.load(Slot::NamingSettings).await? else {
            return Ok(NamingSettings::default());
        };
        match serde_json::from_slice(&bytes) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("Naming settings unreadable, using defaults: {}", e);
                Ok(NamingSettings::default())
            }
        }
    }

    pub async fn save_naming(&self, settings: &NamingSettings) -> StorageResult<()> {
        let bytes = serde_json::to_vec(settings)?;
        self.store.save(Slot::NamingSettings, &bytes).await
    }

    /// Folder used when none has been chosen.
    pub fn default_output_folder(&self) -> &Path {
        &self.default_output_folder
    }

    /// Export destination.
    pub async fn output_folder(&self) -> StorageResult<PathBuf> {
        match self.store.load(Slot::OutputFolder).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(self.default_output_folder.clone()),
        }
    }

    /// Change the export destination. The folder must already exist.
    pub async fn set_output_folder(&self, folder: &Path) -> StorageResult<()> {
        if !tokio::fs::try_exists(folder).await.unwrap_or(false) {
            return Err(StorageError::invalid_path(format!(
                "{} does not exist",
                folder.display()
            )));
        }
        let bytes = serde_json::to_vec(folder)?;
        self.store.save(Slot::OutputFolder, &bytes).await
    }

    /// Create the default export folder if it is missing.
    pub async fn ensure_default_output_folder(&self) -> StorageResult<()> {
        tokio::fs::create_dir_all(&self.default_output_folder).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use veo_models::NamingPosition;

    fn prefs() -> (Arc<MemoryStore>, Preferences) {
        let store = Arc::new(MemoryStore::new());
        let prefs = Preferences::new(store.clone(), "/tmp/veo-default");
        (store, prefs)
    }

    #[tokio::test]
    async fn test_credential_roundtrip() {
        let (_, prefs) = prefs();
        assert!(prefs.credential().await.unwrap().is_none());

        let key = ApiKey::parse("AIzaSyExampleKey1234").unwrap();
        prefs.save_credential(&key).await.unwrap();
        assert_eq!(prefs.credential().await.unwrap(), Some(key));
    }

    #[tokio::test]
    async fn test_credential_override_wins() {
        let (_, prefs) = prefs();
        prefs
            .save_credential(&ApiKey::parse("stored-key-00000").unwrap())
            .await
            .unwrap();

        let session = ApiKey::parse("session-key-1111").unwrap();
        let prefs = prefs.with_credential_override(Some(session.clone()));
        assert_eq!(prefs.credential().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_invalid_stored_credential_is_ignored() {
        let (store, prefs) = prefs();
        store.save(Slot::Credential, b"\"short\"").await.unwrap();
        assert!(prefs.credential().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_naming_defaults_and_roundtrip() {
        let (store, prefs) = prefs();
        assert_eq!(prefs.naming().await.unwrap(), NamingSettings::default());

        let settings = NamingSettings::new("clip_", 5, NamingPosition::Before);
        prefs.save_naming(&settings).await.unwrap();
        assert_eq!(prefs.naming().await.unwrap(), settings);

        store.save(Slot::NamingSettings, b"not json").await.unwrap();
        assert_eq!(prefs.naming().await.unwrap(), NamingSettings::default());
    }

    #[tokio::test]
    async fn test_output_folder() {
        let (_, prefs) = prefs();
        assert_eq!(prefs.output_folder().await.unwrap(), PathBuf::from("/tmp/veo-default"));

        let missing = Path::new("/definitely/not/here");
        assert!(matches!(
            prefs.set_output_folder(missing).await,
            Err(StorageError::InvalidPath(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        prefs.set_output_folder(dir.path()).await.unwrap();
        assert_eq!(prefs.output_folder().await.unwrap(), dir.path());
    }
}
