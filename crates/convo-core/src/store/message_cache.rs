//! Two-tier per-conversation message cache.
//!
//! Memory tier: a small LRU map read synchronously, so an open conversation
//! renders with zero I/O. A miss here never falls through to disk on its own;
//! callers go through `load_async` explicitly.
//!
//! Durable tier: one record per conversation holding the newest N messages,
//! written whole (never partially) and invalidated by schema version or TTL.
//!
//! # Eviction
//! Every save re-checks the total durable byte budget. Over budget, windows
//! are ranked by `access_count × weight − hours_since_last_access` and the
//! lowest-scored non-active ones are dropped until the budget holds. A
//! conversation mid-save or mid-pagination is flagged active and protected,
//! unless a single active window alone exceeds the entire budget.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::CoreConfig;
use crate::kv::DurableKeyValueStore;
use crate::models::Message;
use crate::now_millis;

/// Bump whenever `CachedMessageWindow` (or `Message`) changes shape in a way
/// old records cannot satisfy. Old records are silently discarded as misses.
pub const WINDOW_SCHEMA_VERSION: u32 = 1;

const WINDOW_KEY_PREFIX: &str = "messages/";

fn window_key(conversation_id: &str) -> String {
    format!("{WINDOW_KEY_PREFIX}{conversation_id}")
}

/// Durable record for one conversation's message window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedMessageWindow {
    pub schema_version: u32,
    /// Newest N messages, ascending by (created_at, id).
    pub messages: Vec<Message>,
    /// Baseline for incremental sync: fetch forward from here on next open.
    pub last_message_id: Option<String>,
    /// Unix millis of the last save.
    pub synced_at: u64,
    pub access_count: u32,
    pub last_access_at: u64,
}

/// Merge a cached window with incoming (server) messages.
///
/// Collisions by id keep the incoming copy, which is how edits and deletes
/// reach the cache. The result is ordered by `(created_at, id)`; the id
/// tie-break keeps repeated merges with identical or skewed timestamps from
/// visibly reordering the list.
pub fn merge_messages(cached: Vec<Message>, incoming: Vec<Message>) -> Vec<Message> {
    let mut by_id: HashMap<String, Message> = HashMap::with_capacity(cached.len() + incoming.len());
    for message in cached.into_iter().chain(incoming) {
        by_id.insert(message.id.clone(), message);
    }
    let mut merged: Vec<Message> = by_id.into_values().collect();
    merged.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    merged
}

struct MemoryTier {
    capacity: usize,
    entries: HashMap<String, Vec<Message>>,
    /// LRU order, most recently used at the back.
    order: Vec<String>,
}

impl MemoryTier {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn touch(&mut self, conversation_id: &str) {
        self.order.retain(|id| id != conversation_id);
        self.order.push(conversation_id.to_string());
    }

    fn get(&mut self, conversation_id: &str) -> Option<Vec<Message>> {
        let messages = self.entries.get(conversation_id)?.clone();
        self.touch(conversation_id);
        Some(messages)
    }

    fn insert(&mut self, conversation_id: &str, messages: Vec<Message>) {
        self.entries.insert(conversation_id.to_string(), messages);
        self.touch(conversation_id);
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.first().cloned() else {
                break;
            };
            self.order.remove(0);
            self.entries.remove(&oldest);
        }
    }

    fn remove(&mut self, conversation_id: &str) {
        self.entries.remove(conversation_id);
        self.order.retain(|id| id != conversation_id);
    }
}

pub struct MessageCache<S: DurableKeyValueStore> {
    store: Arc<S>,
    config: CoreConfig,
    memory: parking_lot::Mutex<MemoryTier>,
    /// Per-conversation write locks: saves for the same id queue, saves for
    /// different ids run concurrently.
    save_locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    /// Conversations protected from eviction while an operation is in flight.
    /// Counted, since a save can run while the UI also holds a pagination pin.
    active: parking_lot::Mutex<HashMap<String, usize>>,
    /// Single-flight guard: a second eviction request while one runs is
    /// dropped, not queued. The next save re-triggers if still needed.
    evicting: AtomicBool,
}

impl<S: DurableKeyValueStore> MessageCache<S> {
    pub fn new(store: Arc<S>, config: CoreConfig) -> Self {
        let memory = MemoryTier::new(config.memory_tier_capacity);
        Self {
            store,
            config,
            memory: parking_lot::Mutex::new(memory),
            save_locks: parking_lot::Mutex::new(HashMap::new()),
            active: parking_lot::Mutex::new(HashMap::new()),
            evicting: AtomicBool::new(false),
        }
    }

    fn save_lock(&self, conversation_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.save_locks
            .lock()
            .entry(conversation_id.to_string())
            .or_default()
            .clone()
    }

    /// Flag a conversation as mid-operation (e.g. history pagination) so
    /// eviction leaves its window alone. Pair with `unmark_active`.
    pub fn mark_active(&self, conversation_id: &str) {
        *self
            .active
            .lock()
            .entry(conversation_id.to_string())
            .or_insert(0) += 1;
    }

    pub fn unmark_active(&self, conversation_id: &str) {
        let mut active = self.active.lock();
        if let Some(count) = active.get_mut(conversation_id) {
            *count -= 1;
            if *count == 0 {
                active.remove(conversation_id);
            }
        }
    }

    /// Synchronous memory-tier read. A miss means "go through `load_async`";
    /// it never triggers disk I/O on its own.
    pub fn load(&self, conversation_id: &str) -> Option<Vec<Message>> {
        self.memory.lock().get(conversation_id)
    }

    /// Durable-tier read. Any record that is corrupt, from another schema
    /// version, or older than the TTL is discarded and treated as a miss.
    /// On a hit the record's access statistics are bumped (they feed the
    /// eviction score) and the window is promoted into the memory tier.
    pub async fn load_async(&self, conversation_id: &str) -> Option<CachedMessageWindow> {
        let lock = self.save_lock(conversation_id);
        let _guard = lock.lock().await;

        let key = window_key(conversation_id);
        let mut window = match self.read_window(&key).await? {
            ReadOutcome::Valid(window) => window,
            ReadOutcome::Discard => {
                let _ = self.store.remove(&key).await;
                self.memory.lock().remove(conversation_id);
                return None;
            }
        };

        window.access_count += 1;
        window.last_access_at = now_millis();
        match serde_json::to_vec(&window) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(&key, bytes).await {
                    tracing::warn!("message_cache: failed to persist access stats for {conversation_id}: {e}");
                }
            }
            Err(e) => tracing::warn!("message_cache: failed to encode window for {conversation_id}: {e}"),
        }

        self.memory
            .lock()
            .insert(conversation_id, window.messages.clone());
        Some(window)
    }

    /// Merge `incoming` into the conversation's durable window and persist it.
    ///
    /// The existing record is read back first so two writers merge rather
    /// than clobber each other; truncation to the window size happens only
    /// here, at the persistence boundary. Saves for the same conversation
    /// serialize on the per-id lock.
    pub async fn save(&self, conversation_id: &str, incoming: Vec<Message>) -> Result<()> {
        let lock = self.save_lock(conversation_id);
        let result = {
            let _guard = lock.lock().await;
            self.mark_active(conversation_id);
            let result = self.save_locked(conversation_id, incoming).await;
            self.unmark_active(conversation_id);
            result
        };
        self.evict_if_over_budget().await;
        result
    }

    async fn save_locked(&self, conversation_id: &str, incoming: Vec<Message>) -> Result<()> {
        let key = window_key(conversation_id);
        let existing = match self.read_window(&key).await {
            Some(ReadOutcome::Valid(window)) => Some(window),
            _ => None,
        };

        let (cached, access_count, last_access_at) = match existing {
            Some(window) => (window.messages, window.access_count, window.last_access_at),
            None => (Vec::new(), 0, now_millis()),
        };

        let mut merged = merge_messages(cached, incoming);
        let window_size = self.config.message_window_size;
        if merged.len() > window_size {
            merged.drain(..merged.len() - window_size);
        }

        let window = CachedMessageWindow {
            schema_version: WINDOW_SCHEMA_VERSION,
            last_message_id: merged.last().map(|m| m.id.clone()),
            messages: merged,
            synced_at: now_millis(),
            access_count,
            last_access_at,
        };

        self.store.set(&key, serde_json::to_vec(&window)?).await?;
        self.memory
            .lock()
            .insert(conversation_id, window.messages.clone());
        Ok(())
    }

    /// Patch one message in place (edit delivery). No-op if the window does
    /// not contain it.
    pub async fn update_single_message(&self, conversation_id: &str, message: Message) -> Result<()> {
        self.patch_window(conversation_id, |m| {
            if m.id == message.id {
                *m = message.clone();
            }
        })
        .await
    }

    /// Tombstone a deleted message in the cached window.
    pub async fn mark_message_deleted(&self, conversation_id: &str, message_id: &str) -> Result<()> {
        self.patch_window(conversation_id, |m| {
            if m.id == message_id {
                m.deleted = true;
                m.body = None;
            }
        })
        .await
    }

    async fn patch_window(
        &self,
        conversation_id: &str,
        patch: impl Fn(&mut Message),
    ) -> Result<()> {
        let lock = self.save_lock(conversation_id);
        let _guard = lock.lock().await;

        let key = window_key(conversation_id);
        if let Some(ReadOutcome::Valid(mut window)) = self.read_window(&key).await {
            for message in &mut window.messages {
                patch(message);
            }
            self.store.set(&key, serde_json::to_vec(&window)?).await?;
            self.memory
                .lock()
                .insert(conversation_id, window.messages.clone());
        } else if let Some(messages) = self.memory.lock().entries.get_mut(conversation_id) {
            for message in messages {
                patch(message);
            }
        }
        Ok(())
    }

    /// Drop both tiers for a conversation.
    pub async fn invalidate(&self, conversation_id: &str) -> Result<()> {
        self.memory.lock().remove(conversation_id);
        self.store.remove(&window_key(conversation_id)).await?;
        Ok(())
    }

    async fn read_window(&self, key: &str) -> Option<ReadOutcome> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("message_cache: read failed for {key}: {e}");
                return None;
            }
        };

        let window: CachedMessageWindow = match serde_json::from_slice(&bytes) {
            Ok(window) => window,
            Err(e) => {
                tracing::warn!("message_cache: corrupt record at {key} — discarding: {e}");
                return Some(ReadOutcome::Discard);
            }
        };

        if window.schema_version != WINDOW_SCHEMA_VERSION {
            tracing::info!(
                "message_cache: schema version mismatch at {key} (cached={} current={}) — discarding",
                window.schema_version,
                WINDOW_SCHEMA_VERSION
            );
            return Some(ReadOutcome::Discard);
        }

        let age = now_millis().saturating_sub(window.synced_at);
        if age > self.config.message_window_ttl.as_millis() as u64 {
            tracing::info!("message_cache: record at {key} expired (age={age}ms) — discarding");
            return Some(ReadOutcome::Discard);
        }

        Some(ReadOutcome::Valid(window))
    }

    async fn evict_if_over_budget(&self) {
        if self.evicting.swap(true, Ordering::SeqCst) {
            tracing::trace!("message_cache: eviction already in flight — dropping request");
            return;
        }
        let result = self.run_eviction().await;
        self.evicting.store(false, Ordering::SeqCst);
        if let Err(e) = result {
            tracing::warn!("message_cache: eviction failed: {e:#}");
        }
    }

    async fn run_eviction(&self) -> Result<()> {
        struct Candidate {
            key: String,
            conversation_id: String,
            size: u64,
            access_count: u32,
            last_access_at: u64,
        }

        let keys = self.store.list_keys_by_prefix(WINDOW_KEY_PREFIX).await?;
        let mut candidates = Vec::new();
        let mut corrupt = Vec::new();
        let mut total: u64 = 0;

        for key in keys {
            let Some(bytes) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_slice::<CachedMessageWindow>(&bytes) {
                Ok(window) => {
                    let size = bytes.len() as u64;
                    total += size;
                    candidates.push(Candidate {
                        conversation_id: key
                            .strip_prefix(WINDOW_KEY_PREFIX)
                            .unwrap_or(&key)
                            .to_string(),
                        key,
                        size,
                        access_count: window.access_count,
                        last_access_at: window.last_access_at,
                    });
                }
                Err(_) => corrupt.push(key),
            }
        }

        if !corrupt.is_empty() {
            tracing::warn!("message_cache: dropping {} corrupt records", corrupt.len());
            self.store.remove_many(&corrupt).await?;
        }

        let budget = self.config.cache_byte_budget;
        if total <= budget {
            return Ok(());
        }

        let active: HashSet<String> = self.active.lock().keys().cloned().collect();
        let now = now_millis();
        let weight = self.config.access_score_weight;
        let score = |c: &Candidate| {
            let hours_idle = now.saturating_sub(c.last_access_at) as f64 / 3_600_000.0;
            c.access_count as f64 * weight - hours_idle
        };

        let mut evictable: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| !active.contains(&c.conversation_id))
            .collect();
        evictable.sort_by(|a, b| {
            score(a)
                .partial_cmp(&score(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut evicted = Vec::new();
        for candidate in evictable {
            if total <= budget {
                break;
            }
            total -= candidate.size;
            evicted.push(candidate.key.clone());
            self.memory.lock().remove(&candidate.conversation_id);
        }

        if total > budget {
            // Last resort: one pathological active window can exceed the
            // whole budget by itself and must not grow unbounded.
            for candidate in candidates.iter().filter(|c| active.contains(&c.conversation_id)) {
                if candidate.size > budget {
                    tracing::warn!(
                        "message_cache: evicting active conversation {} ({} bytes exceeds entire {budget}-byte budget)",
                        candidate.conversation_id,
                        candidate.size
                    );
                    total -= candidate.size;
                    evicted.push(candidate.key.clone());
                    self.memory.lock().remove(&candidate.conversation_id);
                }
            }
        }

        if total > budget {
            // Transient, not fatal: the next save after these operations
            // finish will re-trigger eviction.
            tracing::warn!(
                "message_cache: budget overrun ({total} > {budget} bytes) with all windows active — deferring"
            );
        }

        if !evicted.is_empty() {
            tracing::info!("message_cache: evicted {} windows", evicted.len());
            self.store.remove_many(&evicted).await?;
        }
        Ok(())
    }
}

enum ReadOutcome {
    Valid(CachedMessageWindow),
    /// Present but unusable (corrupt, wrong version, expired).
    Discard,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;
    use crate::models::fixtures;

    fn cache_with(config: CoreConfig) -> (Arc<MemoryKeyValueStore>, MessageCache<MemoryKeyValueStore>) {
        let store = Arc::new(MemoryKeyValueStore::new());
        let cache = MessageCache::new(store.clone(), config);
        (store, cache)
    }

    async fn total_bytes(store: &MemoryKeyValueStore) -> u64 {
        let keys = store.list_keys_by_prefix(WINDOW_KEY_PREFIX).await.unwrap();
        let mut total = 0;
        for key in keys {
            total += store.get(&key).await.unwrap().unwrap().len() as u64;
        }
        total
    }

    #[test]
    fn test_merge_incoming_wins_and_order_is_stable() {
        let mut cached_copy = fixtures::message("m2", "c1", "u2", 100);
        cached_copy.body = Some("original".into());
        let cached = vec![fixtures::message("m1", "c1", "u2", 100), cached_copy];

        let mut edited = fixtures::message("m2", "c1", "u2", 100);
        edited.body = Some("edited".into());
        edited.edited = true;

        let merged = merge_messages(cached, vec![edited, fixtures::message("m0", "c1", "u2", 100)]);

        // Identical timestamps: order falls back to id and stays stable
        // however many times the merge runs.
        let ids: Vec<&str> = merged.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m2"]);
        let m2 = merged.iter().find(|m| m.id == "m2").unwrap();
        assert_eq!(m2.body.as_deref(), Some("edited"));
        assert!(m2.edited);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let (_store, cache) = cache_with(CoreConfig::default());

        cache
            .save("c1", vec![fixtures::message("m1", "c1", "u2", 10)])
            .await
            .unwrap();

        // Memory tier hit.
        let messages = cache.load("c1").unwrap();
        assert_eq!(messages.len(), 1);

        // Durable tier hit bumps access stats.
        let window = cache.load_async("c1").await.unwrap();
        assert_eq!(window.access_count, 1);
        assert_eq!(window.last_message_id.as_deref(), Some("m1"));
        let window = cache.load_async("c1").await.unwrap();
        assert_eq!(window.access_count, 2);
    }

    #[tokio::test]
    async fn test_memory_miss_without_save_and_lru_bound() {
        let config = CoreConfig {
            memory_tier_capacity: 2,
            ..CoreConfig::default()
        };
        let (_store, cache) = cache_with(config);
        assert!(cache.load("never-saved").is_none());

        for id in ["c1", "c2", "c3"] {
            cache
                .save(id, vec![fixtures::message("m", id, "u2", 1)])
                .await
                .unwrap();
        }
        // c1 was least recently used and fell out of the memory tier...
        assert!(cache.load("c1").is_none());
        assert!(cache.load("c3").is_some());
        // ...but is still durable.
        assert!(cache.load_async("c1").await.is_some());
    }

    #[tokio::test]
    async fn test_truncation_happens_only_at_persistence_boundary() {
        let config = CoreConfig {
            message_window_size: 2,
            ..CoreConfig::default()
        };
        let (_store, cache) = cache_with(config);

        cache
            .save(
                "c1",
                vec![
                    fixtures::message("m1", "c1", "u2", 1),
                    fixtures::message("m2", "c1", "u2", 2),
                ],
            )
            .await
            .unwrap();
        cache
            .save("c1", vec![fixtures::message("m3", "c1", "u2", 3)])
            .await
            .unwrap();

        let window = cache.load_async("c1").await.unwrap();
        let ids: Vec<&str> = window.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3"]);
        assert_eq!(window.last_message_id.as_deref(), Some("m3"));
    }

    #[tokio::test]
    async fn test_version_mismatch_discards_record() {
        let (store, cache) = cache_with(CoreConfig::default());
        cache
            .save("c1", vec![fixtures::message("m1", "c1", "u2", 10)])
            .await
            .unwrap();

        let key = window_key("c1");
        let mut window: CachedMessageWindow =
            serde_json::from_slice(&store.get(&key).await.unwrap().unwrap()).unwrap();
        window.schema_version = WINDOW_SCHEMA_VERSION + 1;
        store.set(&key, serde_json::to_vec(&window).unwrap()).await.unwrap();

        assert!(cache.load_async("c1").await.is_none());
        assert_eq!(store.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_record_is_a_miss() {
        let (store, cache) = cache_with(CoreConfig::default());
        cache
            .save("c1", vec![fixtures::message("m1", "c1", "u2", 10)])
            .await
            .unwrap();

        let key = window_key("c1");
        let mut window: CachedMessageWindow =
            serde_json::from_slice(&store.get(&key).await.unwrap().unwrap()).unwrap();
        window.synced_at = 1; // long past the TTL
        store.set(&key, serde_json::to_vec(&window).unwrap()).await.unwrap();

        assert!(cache.load_async("c1").await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_a_miss() {
        let (store, cache) = cache_with(CoreConfig::default());
        store
            .set(&window_key("c1"), b"not json".to_vec())
            .await
            .unwrap();
        assert!(cache.load_async("c1").await.is_none());
        assert_eq!(store.get(&window_key("c1")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_single_message_patches_durable_record() {
        let (_store, cache) = cache_with(CoreConfig::default());
        cache
            .save(
                "c1",
                vec![
                    fixtures::message("m1", "c1", "u2", 1),
                    fixtures::message("m2", "c1", "u2", 2),
                ],
            )
            .await
            .unwrap();

        let mut edited = fixtures::message("m1", "c1", "u2", 1);
        edited.body = Some("edited".into());
        edited.edited = true;
        cache.update_single_message("c1", edited).await.unwrap();

        let window = cache.load_async("c1").await.unwrap();
        let m1 = window.messages.iter().find(|m| m.id == "m1").unwrap();
        assert!(m1.edited);

        cache.mark_message_deleted("c1", "m2").await.unwrap();
        let window = cache.load_async("c1").await.unwrap();
        let m2 = window.messages.iter().find(|m| m.id == "m2").unwrap();
        assert!(m2.deleted);
        assert!(m2.body.is_none());
    }

    #[tokio::test]
    async fn test_eviction_enforces_byte_budget() {
        let config = CoreConfig {
            cache_byte_budget: 2_000,
            ..CoreConfig::default()
        };
        let (store, cache) = cache_with(config);

        for i in 0..8 {
            let id = format!("c{i}");
            cache
                .save(&id, vec![fixtures::message(&format!("m{i}"), &id, "u2", i)])
                .await
                .unwrap();
        }

        assert!(total_bytes(&store).await <= 2_000);
        let remaining = store.list_keys_by_prefix(WINDOW_KEY_PREFIX).await.unwrap();
        assert!(remaining.len() < 8);
        assert!(!remaining.is_empty());
    }

    #[tokio::test]
    async fn test_eviction_prefers_low_score_windows() {
        let config = CoreConfig {
            cache_byte_budget: 1_200,
            ..CoreConfig::default()
        };
        let (store, cache) = cache_with(config);

        cache
            .save("hot", vec![fixtures::message("m1", "hot", "u2", 1)])
            .await
            .unwrap();
        // Several reads raise the hot window's access count well above cold's.
        for _ in 0..5 {
            cache.load_async("hot").await.unwrap();
        }

        for i in 0..4 {
            let id = format!("cold{i}");
            cache
                .save(&id, vec![fixtures::message("m", &id, "u2", 1)])
                .await
                .unwrap();
        }

        let remaining = store.list_keys_by_prefix(WINDOW_KEY_PREFIX).await.unwrap();
        assert!(remaining.contains(&window_key("hot")));
    }

    #[tokio::test]
    async fn test_active_windows_survive_eviction() {
        let config = CoreConfig {
            cache_byte_budget: 700,
            ..CoreConfig::default()
        };
        let (store, cache) = cache_with(config);

        cache.mark_active("pinned");
        cache
            .save("pinned", vec![fixtures::message("m1", "pinned", "u2", 1)])
            .await
            .unwrap();
        for i in 0..3 {
            let id = format!("c{i}");
            cache
                .save(&id, vec![fixtures::message("m", &id, "u2", 1)])
                .await
                .unwrap();
        }

        let remaining = store.list_keys_by_prefix(WINDOW_KEY_PREFIX).await.unwrap();
        assert!(remaining.contains(&window_key("pinned")));
        cache.unmark_active("pinned");
    }

    #[tokio::test]
    async fn test_single_active_window_over_entire_budget_is_evicted() {
        let config = CoreConfig {
            cache_byte_budget: 64,
            ..CoreConfig::default()
        };
        let (store, cache) = cache_with(config);

        cache.mark_active("huge");
        cache
            .save(
                "huge",
                (0..10)
                    .map(|i| fixtures::message(&format!("m{i}"), "huge", "u2", i))
                    .collect(),
            )
            .await
            .unwrap();

        assert_eq!(store.get(&window_key("huge")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate_drops_both_tiers() {
        let (store, cache) = cache_with(CoreConfig::default());
        cache
            .save("c1", vec![fixtures::message("m1", "c1", "u2", 1)])
            .await
            .unwrap();

        cache.invalidate("c1").await.unwrap();
        assert!(cache.load("c1").is_none());
        assert_eq!(store.get(&window_key("c1")).await.unwrap(), None);
    }
}
