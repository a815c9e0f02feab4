//! Durable key-value seam.
//!
//! The caches only ever see this trait; the app shell decides what actually
//! backs it. Two implementations ship here: a filesystem store (one file per
//! key, atomic replace-on-write) and an in-memory store for tests and
//! previews.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Generic persistent storage. Values are opaque bytes; keys are slash-
/// separated paths (`messages/<conversation-id>`, `conversations/snapshot`).
///
/// No ordering is guaranteed between two outstanding calls; callers that need
/// serialization (the caches do) hold their own locks around these.
#[async_trait]
pub trait DurableKeyValueStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
    async fn list_keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
    async fn remove_many(&self, keys: &[String]) -> Result<(), StorageError>;
}

/// Filesystem-backed store: one file per key under `root`, file name is the
/// hex-encoded key (keys contain `/`, which is not filename-safe).
///
/// Writes go to a `.tmp` sibling first and are renamed into place, so an
/// unexpected shutdown mid-write can never leave a partially-written record.
pub struct FsKeyValueStore {
    root: PathBuf,
}

impl FsKeyValueStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(hex::encode(key.as_bytes()))
    }

    fn key_from_file_name(name: &str) -> Option<String> {
        let bytes = hex::decode(name).ok()?;
        String::from_utf8(bytes).ok()
    }
}

#[async_trait]
impl DurableKeyValueStore for FsKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let temp = path.with_extension("tmp");
        std::fs::write(&temp, &value)?;
        std::fs::rename(&temp, &path)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            // Skip in-flight temp files and anything that isn't one of ours.
            let Some(key) = Self::key_from_file_name(name) else {
                continue;
            };
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn remove_many(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }
}

/// In-memory store. Used by tests and as a stand-in while the app shell has
/// no storage directory yet (e.g. previews).
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: parking_lot::Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl DurableKeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn list_keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn remove_many(&self, keys: &[String]) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_fs_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FsKeyValueStore::new(dir.path()).unwrap();

        store.set("messages/c1", b"hello".to_vec()).await.unwrap();
        assert_eq!(store.get("messages/c1").await.unwrap(), Some(b"hello".to_vec()));

        store.remove("messages/c1").await.unwrap();
        assert_eq!(store.get("messages/c1").await.unwrap(), None);
        // Removing a missing key is not an error.
        store.remove("messages/c1").await.unwrap();
    }

    #[tokio::test]
    async fn test_fs_store_prefix_listing() {
        let dir = tempdir().unwrap();
        let store = FsKeyValueStore::new(dir.path()).unwrap();

        store.set("messages/c1", vec![1]).await.unwrap();
        store.set("messages/c2", vec![2]).await.unwrap();
        store.set("conversations/snapshot", vec![3]).await.unwrap();

        let keys = store.list_keys_by_prefix("messages/").await.unwrap();
        assert_eq!(keys, vec!["messages/c1".to_string(), "messages/c2".to_string()]);

        store
            .remove_many(&["messages/c1".to_string(), "messages/c2".to_string()])
            .await
            .unwrap();
        assert!(store.list_keys_by_prefix("messages/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryKeyValueStore::new();
        store.set("a/b", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.get("a/b").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.list_keys_by_prefix("a/").await.unwrap(), vec!["a/b"]);
        store.remove("a/b").await.unwrap();
        assert!(store.is_empty());
    }
}
