//! Durable snapshot of the conversation list, served instantly on cold start.
//!
//! One versioned record holds the whole snapshot: the ordered conversation
//! array plus per-conversation change timestamps and unread counts. A schema
//! version mismatch invalidates the entire record — a snapshot is never
//! partially trusted.
//!
//! Writes are globally serialized through one lock, and each writer re-reads
//! the current record after acquiring it: a writer that queued behind another
//! must merge with what that writer persisted, not overwrite it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::kv::DurableKeyValueStore;
use crate::models::Conversation;
use crate::now_millis;

/// Bump when `CachedConversationSnapshot` or `Conversation` changes shape.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

const SNAPSHOT_KEY: &str = "conversations/snapshot";

#[derive(Debug, Serialize, Deserialize)]
pub struct CachedConversationSnapshot {
    pub schema_version: u32,
    /// Unix millis when this snapshot was written.
    pub saved_at: u64,
    pub conversations: Vec<Conversation>,
    /// conversation id -> last change timestamp (Unix millis).
    pub timestamps: HashMap<String, u64>,
    /// conversation id -> unread count, re-applied on load.
    pub unread_counts: HashMap<String, u32>,
}

pub struct ConversationListCache<S: DurableKeyValueStore> {
    store: Arc<S>,
    write_lock: tokio::sync::Mutex<()>,
}

impl<S: DurableKeyValueStore> ConversationListCache<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Load the snapshot, or `None` on any failure (missing, corrupt, wrong
    /// schema version). Unread counts and change timestamps are re-applied
    /// from the snapshot's maps, which guards against a conversation entry
    /// that was serialized before its count last changed.
    pub async fn load(&self) -> Option<Vec<Conversation>> {
        let snapshot = self.read_snapshot().await?;

        let mut conversations = snapshot.conversations;
        for conversation in &mut conversations {
            if let Some(count) = snapshot.unread_counts.get(&conversation.id) {
                conversation.unread_count = *count;
            }
            if let Some(timestamp) = snapshot.timestamps.get(&conversation.id) {
                conversation.updated_at = conversation.updated_at.max(*timestamp);
            }
        }
        Some(conversations)
    }

    /// Persist `conversations` as the new snapshot.
    ///
    /// Conversations present in this write are authoritative for their own
    /// entry, timestamp, and unread count; entries only present in the prior
    /// snapshot (e.g. from pages this writer never fetched) keep their cached
    /// values and are appended in their prior relative order.
    pub async fn save(&self, conversations: &[Conversation]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut timestamps: HashMap<String, u64> = conversations
            .iter()
            .map(|c| (c.id.clone(), c.updated_at))
            .collect();
        let mut unread_counts: HashMap<String, u32> = conversations
            .iter()
            .map(|c| (c.id.clone(), c.unread_count))
            .collect();
        let mut merged = conversations.to_vec();

        // Re-read under the lock: a writer that queued behind another must
        // merge with the record that writer produced.
        if let Some(previous) = self.read_snapshot().await {
            let new_ids: HashSet<&str> = conversations.iter().map(|c| c.id.as_str()).collect();
            for conversation in previous.conversations {
                if !new_ids.contains(conversation.id.as_str()) {
                    merged.push(conversation);
                }
            }
            for (id, timestamp) in previous.timestamps {
                timestamps.entry(id).or_insert(timestamp);
            }
            for (id, count) in previous.unread_counts {
                unread_counts.entry(id).or_insert(count);
            }
        }

        let snapshot = CachedConversationSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            saved_at: now_millis(),
            conversations: merged,
            timestamps,
            unread_counts,
        };

        self.store
            .set(SNAPSHOT_KEY, serde_json::to_vec(&snapshot)?)
            .await?;
        Ok(())
    }

    pub async fn invalidate(&self) -> Result<()> {
        self.store.remove(SNAPSHOT_KEY).await?;
        Ok(())
    }

    async fn read_snapshot(&self) -> Option<CachedConversationSnapshot> {
        let bytes = match self.store.get(SNAPSHOT_KEY).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("list_cache: snapshot read failed: {e}");
                return None;
            }
        };

        let snapshot: CachedConversationSnapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("list_cache: corrupt snapshot — discarding: {e}");
                let _ = self.store.remove(SNAPSHOT_KEY).await;
                return None;
            }
        };

        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            tracing::info!(
                "list_cache: schema version mismatch (cached={} current={}) — discarding",
                snapshot.schema_version,
                SNAPSHOT_SCHEMA_VERSION
            );
            let _ = self.store.remove(SNAPSHOT_KEY).await;
            return None;
        }

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;
    use crate::models::fixtures;

    fn cache() -> (Arc<MemoryKeyValueStore>, ConversationListCache<MemoryKeyValueStore>) {
        let store = Arc::new(MemoryKeyValueStore::new());
        let cache = ConversationListCache::new(store.clone());
        (store, cache)
    }

    #[tokio::test]
    async fn test_round_trip_reapplies_unread_counts() {
        let (_store, cache) = cache();
        let mut a = fixtures::conversation("A", 10);
        a.unread_count = 3;
        cache.save(&[a, fixtures::conversation("B", 5)]).await.unwrap();

        let loaded = cache.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "A");
        assert_eq!(loaded[0].unread_count, 3);
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_none() {
        let (_store, cache) = cache();
        assert!(cache.load().await.is_none());
    }

    #[tokio::test]
    async fn test_version_mismatch_discards_whole_snapshot() {
        let (store, cache) = cache();
        cache.save(&[fixtures::conversation("A", 10)]).await.unwrap();

        let mut snapshot: CachedConversationSnapshot =
            serde_json::from_slice(&store.get(SNAPSHOT_KEY).await.unwrap().unwrap()).unwrap();
        snapshot.schema_version = SNAPSHOT_SCHEMA_VERSION + 1;
        store
            .set(SNAPSHOT_KEY, serde_json::to_vec(&snapshot).unwrap())
            .await
            .unwrap();

        assert!(cache.load().await.is_none());
        assert_eq!(store.get(SNAPSHOT_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_none() {
        let (store, cache) = cache();
        store.set(SNAPSHOT_KEY, b"{oops".to_vec()).await.unwrap();
        assert!(cache.load().await.is_none());
    }

    #[tokio::test]
    async fn test_partial_write_keeps_absent_entries() {
        let (_store, cache) = cache();
        let mut old = fixtures::conversation("old", 5);
        old.unread_count = 7;
        cache
            .save(&[fixtures::conversation("A", 10), old])
            .await
            .unwrap();

        // A later write covering only page 0: "old" was not refetched.
        let mut a = fixtures::conversation("A", 20);
        a.unread_count = 1;
        cache.save(&[a]).await.unwrap();

        let loaded = cache.load().await.unwrap();
        let ids: Vec<&str> = loaded.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "old"]);
        // Present-in-write wins; absent keeps its cached values.
        assert_eq!(loaded[0].updated_at, 20);
        assert_eq!(loaded[0].unread_count, 1);
        assert_eq!(loaded[1].unread_count, 7);
    }
}
