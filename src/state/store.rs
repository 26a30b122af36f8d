use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, warn};

use crate::error::{BotError, Result};

/// Raw storage behind the durable store, one document per key
#[async_trait]
pub trait StorageMedium: Send + Sync {
    /// Read a document, `None` if it was never written
    async fn read(&self, key: &str) -> std::io::Result<Option<String>>;

    async fn write(&self, key: &str, contents: &str) -> std::io::Result<()>;
}

/// JSON documents stored as `<root>/<key>.json`
pub struct FileMedium {
    root: PathBuf,
}

impl FileMedium {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

#[async_trait]
impl StorageMedium for FileMedium {
    async fn read(&self, key: &str) -> std::io::Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, key: &str, contents: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        // Write to temp file first, then rename
        let path = self.path_for(key);
        let temp_path = self.root.join(format!("{}.json.tmp", key));
        tokio::fs::write(&temp_path, contents).await?;
        tokio::fs::rename(&temp_path, &path).await
    }
}

/// Named records with default-on-missing loads and restore-on-failure saves
pub struct DurableStore {
    medium: Arc<dyn StorageMedium>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DurableStore {
    pub fn new(medium: Arc<dyn StorageMedium>) -> Self {
        Self {
            medium,
            locks: DashMap::new(),
        }
    }

    /// Exclusive access to one record for a read-modify-write sequence.
    /// Callers holding several guards must acquire them in key order.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        self.key_lock(key).lock_owned().await
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load a record. A record that was never written is persisted as `default`
    /// unless its lock is held, in which case the holder's save creates it.
    /// An unreadable or corrupt record yields `default` and is left untouched.
    pub async fn load<T>(&self, key: &str, default: T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        match self.medium.read(key).await {
            Ok(Some(content)) => match serde_json::from_str(&content) {
                Ok(value) => value,
                Err(e) => {
                    error!("Record '{}' is corrupt, using default: {}", key, e);
                    default
                }
            },
            Ok(None) => {
                self.create_default(key, &default).await;
                default
            }
            Err(e) => {
                error!("Could not read record '{}', using default: {}", key, e);
                default
            }
        }
    }

    /// Persist a record. On failure the previously stored document is put back
    /// and `StorageWrite` is returned.
    pub async fn save<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let backup = match self.medium.read(key).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!("Could not read '{}' before writing, no backup held: {}", key, e);
                None
            }
        };

        if let Err(e) = self.write_value(key, value).await {
            error!("Failed to save record '{}': {}", key, e);
            if let Some(previous) = backup {
                if let Err(restore_err) = self.medium.write(key, &previous).await {
                    error!("Failed to restore record '{}': {}", key, restore_err);
                }
            }
            return Err(e);
        }

        Ok(())
    }

    async fn create_default<T: Serialize>(&self, key: &str, default: &T) {
        // Also covers callers that load while holding the lock themselves
        let Ok(_guard) = self.key_lock(key).try_lock_owned() else {
            debug!("Record '{}' not found and locked, not creating it", key);
            return;
        };
        if !matches!(self.medium.read(key).await, Ok(None)) {
            return;
        }
        debug!("Record '{}' not found, creating it", key);
        if let Err(e) = self.write_value(key, default).await {
            warn!("Could not create record '{}': {}", key, e);
        }
    }

    async fn write_value<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value)?;
        self.medium
            .write(key, &content)
            .await
            .map_err(|source| BotError::StorageWrite {
                key: key.to_string(),
                source,
            })
    }
}

/// Shared store type
pub type SharedStore = Arc<DurableStore>;

pub fn create_shared_store(medium: Arc<dyn StorageMedium>) -> SharedStore {
    Arc::new(DurableStore::new(medium))
}


#[cfg(test)]
mod tests {
    use super::memory::{memory_store, MemoryMedium};
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_load_missing_persists_default() {
        let (store, medium) = memory_store();

        let value: HashMap<String, u32> = store.load("strikes", HashMap::new()).await;
        assert!(value.is_empty());
        assert_eq!(medium.raw("strikes").as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_load_missing_does_not_race_locked_save() {
        let (store, medium) = memory_store();

        let guard = store.lock("strikes").await;
        let value: HashMap<String, u32> = store.load("strikes", HashMap::new()).await;
        assert!(value.is_empty());
        assert_eq!(medium.raw("strikes"), None);

        store.save("strikes", &HashMap::from([("1".to_string(), 2u32)])).await.unwrap();
        let other: HashMap<String, u32> = store.load("strikes", HashMap::new()).await;
        drop(guard);

        assert_eq!(other.get("1"), Some(&2));
        let loaded: HashMap<String, u32> = store.load("strikes", HashMap::new()).await;
        assert_eq!(loaded.get("1"), Some(&2));
    }

    #[tokio::test]
    async fn test_load_corrupt_returns_default_without_overwriting() {
        let (store, medium) = memory_store();
        medium.put_raw("roster", "[1, 2");

        let value: Vec<u64> = store.load("roster", Vec::new()).await;
        assert!(value.is_empty());
        assert_eq!(medium.raw("roster").as_deref(), Some("[1, 2"));
    }

    #[tokio::test]
    async fn test_load_unreadable_returns_default() {
        let (store, medium) = memory_store();
        medium.put_raw("roster", "[1]");
        medium.set_fail_reads(true);

        let value: Vec<u64> = store.load("roster", Vec::new()).await;
        assert!(value.is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_value() {
        let medium = MemoryMedium::new();
        let store = DurableStore::new(medium.clone());
        store.save("roster", &vec![1u64, 2]).await.unwrap();

        medium.fail_next_writes(1);
        let result = store.save("roster", &vec![9u64]).await;
        assert!(matches!(result, Err(BotError::StorageWrite { .. })));

        let value: Vec<u64> = store.load("roster", Vec::new()).await;
        assert_eq!(value, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_file_medium_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DurableStore::new(Arc::new(FileMedium::new(dir.path().join("state"))));

        store.save("strikes", &HashMap::from([("42".to_string(), 3u32)])).await.unwrap();
        let loaded: HashMap<String, u32> = store.load("strikes", HashMap::new()).await;
        assert_eq!(loaded.get("42"), Some(&3));
        assert!(dir.path().join("state").join("strikes.json").exists());
    }
}
