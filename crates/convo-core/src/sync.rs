//! Orchestrates the conversation list lifecycle: cold start, pagination,
//! live-update routing, and reconnect reconciliation.
//!
//! This is the only component that touches everything, and the object a UI
//! layer holds. All state mutation funnels through `dispatch` into the pure
//! reducer; background work (cache writes, enrichment, unread confirmation)
//! is spawned fire-and-forget and merges its completion back in via
//! dispatched actions, so the UI never blocks on disk or network.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::config::CoreConfig;
use crate::enrichment::EnrichmentCoordinator;
use crate::events::LiveUpdate;
use crate::gateway::BackendGateway;
use crate::kv::DurableKeyValueStore;
use crate::models::{Conversation, Message};
use crate::now_millis;
use crate::store::{apply, Action, ConversationListCache, ConversationState, MessageCache};

/// Bounded window of recently-seen live event identities. The live channel
/// may redeliver events; anything inside the window is dropped.
struct SeenWindow {
    capacity: usize,
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl SeenWindow {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ids: HashSet::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns false if the key was already in the window.
    fn insert(&mut self, key: String) -> bool {
        if self.ids.contains(&key) {
            return false;
        }
        self.ids.insert(key.clone());
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        true
    }
}

pub struct SyncCoordinator<G: BackendGateway, S: DurableKeyValueStore> {
    gateway: Arc<G>,
    config: CoreConfig,
    state: parking_lot::RwLock<ConversationState>,
    message_cache: Arc<MessageCache<S>>,
    list_cache: Arc<ConversationListCache<S>>,
    enrichment: Arc<EnrichmentCoordinator<G>>,

    loading: AtomicBool,
    has_more: AtomicBool,
    next_offset: AtomicUsize,
    /// Unix millis of the last successful full or reconciliation sync;
    /// 0 means never synced.
    last_sync_at: AtomicU64,
    channel_healthy: AtomicBool,
    current_conversation_id: parking_lot::Mutex<Option<String>>,
    seen: parking_lot::Mutex<SeenWindow>,

    snapshot_dirty: AtomicBool,
    flush_scheduled: AtomicBool,
    live_task: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<G: BackendGateway, S: DurableKeyValueStore> SyncCoordinator<G, S> {
    pub fn new(
        gateway: Arc<G>,
        store: Arc<S>,
        current_user_id: impl Into<String>,
        config: CoreConfig,
    ) -> Arc<Self> {
        let enrichment = Arc::new(EnrichmentCoordinator::new(
            gateway.clone(),
            config.enrichment_backoff,
        ));
        Arc::new(Self {
            message_cache: Arc::new(MessageCache::new(store.clone(), config.clone())),
            list_cache: Arc::new(ConversationListCache::new(store)),
            enrichment,
            state: parking_lot::RwLock::new(ConversationState::new(current_user_id)),
            seen: parking_lot::Mutex::new(SeenWindow::new(config.seen_window_capacity)),
            gateway,
            config,
            loading: AtomicBool::new(false),
            has_more: AtomicBool::new(false),
            next_offset: AtomicUsize::new(0),
            last_sync_at: AtomicU64::new(0),
            channel_healthy: AtomicBool::new(true),
            current_conversation_id: parking_lot::Mutex::new(None),
            snapshot_dirty: AtomicBool::new(false),
            flush_scheduled: AtomicBool::new(false),
            live_task: parking_lot::Mutex::new(None),
        })
    }

    // ===== UI surface =====

    pub fn conversations(&self) -> Vec<Conversation> {
        self.state.read().conversations.clone()
    }

    pub fn unread_total(&self) -> u32 {
        self.state.read().unread_total()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn has_more(&self) -> bool {
        self.has_more.load(Ordering::SeqCst)
    }

    pub fn message_cache(&self) -> &Arc<MessageCache<S>> {
        &self.message_cache
    }

    /// The conversation the user currently has open. Suppresses the
    /// optimistic unread increment for messages arriving there.
    pub fn set_current_conversation_id(&self, conversation_id: Option<String>) {
        *self.current_conversation_id.lock() = conversation_id;
    }

    /// Route an action into the reducer. The write lock is held only for the
    /// duration of the pure state transition.
    pub fn dispatch(&self, action: Action) {
        let mut state = self.state.write();
        apply(&mut state, action);
    }

    /// Cold start: serve whatever the durable snapshot has immediately, wire
    /// up the live channel, then fetch page 0 and reconcile. A network
    /// failure here silently leaves the cached list in place.
    pub async fn start(self: &Arc<Self>) {
        self.loading.store(true, Ordering::SeqCst);

        if let Some(cached) = self.list_cache.load().await {
            tracing::info!("sync: serving {} conversations from snapshot", cached.len());
            self.dispatch(Action::ReplaceAll(cached));
        }

        // Subscribe before the first fetch so no event slips between them.
        let receiver = self.gateway.subscribe();
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run_live_loop(receiver).await });
        *self.live_task.lock() = Some(handle);

        match self.fetch_page(0).await {
            Ok((conversations, has_more)) => {
                self.next_offset.store(conversations.len(), Ordering::SeqCst);
                self.dispatch(Action::ReplaceAll(conversations));
                self.has_more.store(has_more, Ordering::SeqCst);
                self.last_sync_at.store(now_millis(), Ordering::SeqCst);
                if let Err(e) = self.persist_snapshot().await {
                    tracing::warn!("sync: snapshot write after cold load failed: {e:#}");
                }
            }
            Err(e) => {
                tracing::warn!("sync: cold load failed — serving cached list only: {e:#}");
                // Conservative: better no "load more" affordance than a wrong one.
                self.has_more.store(false, Ordering::SeqCst);
            }
        }

        self.loading.store(false, Ordering::SeqCst);
    }

    /// Fetch the next page and append it. Deduplication and ordering are the
    /// reducer's job.
    pub async fn load_more_conversations(&self) -> Result<()> {
        if !self.has_more.load(Ordering::SeqCst) || self.loading.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let offset = self.next_offset.load(Ordering::SeqCst);
        let result = self.fetch_page(offset).await;
        let outcome = match result {
            Ok((conversations, has_more)) => {
                self.next_offset
                    .store(offset + conversations.len(), Ordering::SeqCst);
                self.dispatch(Action::AppendConversations(conversations));
                self.has_more.store(has_more, Ordering::SeqCst);
                self.mark_snapshot_dirty_plain();
                Ok(())
            }
            Err(e) => {
                tracing::warn!("sync: pagination fetch at offset {offset} failed: {e:#}");
                Err(e)
            }
        };
        self.loading.store(false, Ordering::SeqCst);
        outcome
    }

    /// Re-fetch page 0 and reconcile, e.g. on pull-to-refresh.
    pub async fn refresh_conversations(self: &Arc<Self>) -> Result<()> {
        let (conversations, has_more) = self.fetch_page(0).await?;
        self.next_offset.store(conversations.len(), Ordering::SeqCst);
        self.dispatch(Action::ReplaceAll(conversations));
        self.has_more.store(has_more, Ordering::SeqCst);
        self.last_sync_at.store(now_millis(), Ordering::SeqCst);
        self.mark_snapshot_dirty();
        Ok(())
    }

    /// Clear the unread count locally and confirm with the server. The local
    /// clear is optimistic; a gateway failure is logged, not surfaced.
    pub fn mark_as_read(self: &Arc<Self>, conversation_id: &str) {
        self.dispatch(Action::SetUnreadCount {
            conversation_id: conversation_id.to_string(),
            count: 0,
        });
        self.mark_snapshot_dirty();

        let gateway = self.gateway.clone();
        let conversation_id = conversation_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = gateway.mark_as_read(&conversation_id).await {
                tracing::warn!("sync: mark_as_read({conversation_id}) failed: {e:#}");
            }
        });
    }

    /// Message history for one conversation: memory tier, then durable tier,
    /// then the network. Cache hits kick off an incremental catch-up fetch in
    /// the background.
    pub async fn load_messages(self: &Arc<Self>, conversation_id: &str) -> Result<Vec<Message>> {
        if let Some(messages) = self.message_cache.load(conversation_id) {
            self.spawn_incremental_message_sync(conversation_id, messages.last().map(|m| m.id.clone()));
            return Ok(messages);
        }

        if let Some(window) = self.message_cache.load_async(conversation_id).await {
            self.spawn_incremental_message_sync(conversation_id, window.last_message_id.clone());
            return Ok(window.messages);
        }

        let messages = self
            .gateway
            .get_messages(conversation_id, self.config.message_window_size, None, None)
            .await?;
        if let Err(e) = self.message_cache.save(conversation_id, messages.clone()).await {
            tracing::warn!("sync: message cache write for {conversation_id} failed: {e:#}");
        }
        Ok(messages)
    }

    /// History pagination backwards from `before_id`. The window is pinned
    /// active for the duration so eviction cannot pull it out from under the
    /// scroll position. Older pages are not persisted: the durable window
    /// only keeps the newest messages, which would truncate them right back.
    pub async fn load_older_messages(
        &self,
        conversation_id: &str,
        before_id: &str,
    ) -> Result<(Vec<Message>, bool)> {
        self.message_cache.mark_active(conversation_id);
        let result = async {
            let limit = self.config.message_window_size;
            let mut messages = self
                .gateway
                .get_messages(conversation_id, limit + 1, None, Some(before_id))
                .await?;
            let has_more = messages.len() > limit;
            if has_more {
                messages.remove(0);
            }
            Ok((messages, has_more))
        }
        .await;
        self.message_cache.unmark_active(conversation_id);
        result
    }

    /// Write the snapshot out now if dirty. Call from the app's on-suspend
    /// hook; also invoked by the debounced background flush.
    pub async fn flush(&self) -> Result<()> {
        if !self.snapshot_dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.persist_snapshot().await {
            // Keep the snapshot pending so a later flush retries the write.
            self.snapshot_dirty.store(true, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    /// Tear down the live loop and flush pending snapshot state.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.live_task.lock().take() {
            handle.abort();
        }
        if let Err(e) = self.flush().await {
            tracing::warn!("sync: final snapshot flush failed: {e:#}");
        }
    }

    /// Mark the live channel unhealthy; the next reconnect will force a full
    /// reconciliation regardless of how recent the last sync was.
    pub fn flag_channel_unhealthy(&self) {
        self.channel_healthy.store(false, Ordering::SeqCst);
    }

    // ===== internals =====

    async fn fetch_page(&self, offset: usize) -> Result<(Vec<Conversation>, bool)> {
        let limit = self.config.page_size;
        // limit+1 probe: the overflow row answers "has more" without a
        // separate count query.
        let mut conversations = self.gateway.get_conversations(limit + 1, offset).await?;
        let has_more = conversations.len() > limit;
        conversations.truncate(limit);
        Ok((conversations, has_more))
    }

    async fn persist_snapshot(&self) -> Result<()> {
        let conversations = self.conversations();
        self.list_cache.save(&conversations).await
    }

    async fn run_live_loop(self: Arc<Self>, mut receiver: mpsc::Receiver<LiveUpdate>) {
        while let Some(update) = receiver.recv().await {
            self.handle_live_update(update).await;
        }
        tracing::info!("sync: live channel closed");
        self.channel_healthy.store(false, Ordering::SeqCst);
    }

    async fn handle_live_update(self: &Arc<Self>, update: LiveUpdate) {
        if let Some(key) = update.dedupe_key() {
            if !self.seen.lock().insert(key) {
                tracing::trace!("sync: dropping duplicate live event");
                return;
            }
        }

        match update {
            LiveUpdate::NewMessage {
                conversation_id,
                message,
            } => self.on_new_message(conversation_id, message),

            LiveUpdate::MessageUpdated {
                conversation_id,
                message,
            } => {
                self.dispatch(Action::MessageUpdated {
                    conversation_id: conversation_id.clone(),
                    message: message.clone(),
                });
                let cache = self.message_cache.clone();
                tokio::spawn(async move {
                    if let Err(e) = cache.update_single_message(&conversation_id, message).await {
                        tracing::warn!("sync: cached message update failed: {e:#}");
                    }
                });
                self.mark_snapshot_dirty();
            }

            LiveUpdate::MessageDeleted {
                conversation_id,
                message_id,
            } => {
                self.dispatch(Action::MessageDeleted {
                    conversation_id: conversation_id.clone(),
                    message_id: message_id.clone(),
                });
                let cache = self.message_cache.clone();
                let cid = conversation_id.clone();
                let mid = message_id.clone();
                tokio::spawn(async move {
                    if let Err(e) = cache.mark_message_deleted(&cid, &mid).await {
                        tracing::warn!("sync: cached message tombstone failed: {e:#}");
                    }
                });
                // The list needs a new "previous" last message; resolve it
                // asynchronously and re-inject.
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    this.resolve_new_last_message(&conversation_id, &message_id).await;
                });
                self.mark_snapshot_dirty();
            }

            LiveUpdate::ConversationUpdated {
                conversation_id,
                updated_at,
            } => {
                let known = self.state.read().get(&conversation_id).is_some();
                self.dispatch(Action::ConversationUpdated {
                    conversation_id: conversation_id.clone(),
                    updated_at,
                });
                if !known {
                    self.spawn_enrichment(conversation_id, None);
                }
                self.mark_snapshot_dirty();
            }

            LiveUpdate::Reconnected => self.on_reconnect().await,
        }
    }

    fn on_new_message(self: &Arc<Self>, conversation_id: String, message: Message) {
        let (was_known, needs_enrichment, from_peer) = {
            let state = self.state.read();
            let existing = state.get(&conversation_id);
            (
                existing.is_some(),
                existing.map(|c| c.is_under_enriched()).unwrap_or(true),
                message.sender_id != state.current_user_id,
            )
        };
        let currently_open =
            self.current_conversation_id.lock().as_deref() == Some(conversation_id.as_str());

        // Dispatch first: the message lands in the list even if everything
        // after this fails.
        self.dispatch(Action::NewMessage {
            conversation_id: conversation_id.clone(),
            message: message.clone(),
        });

        if from_peer && !currently_open {
            // For an unknown conversation the synthesized record already
            // counts this message; incrementing on top would double it.
            if was_known {
                self.dispatch(Action::IncrementUnread {
                    conversation_id: conversation_id.clone(),
                });
            }
            // Optimistic bump now, authoritative count when the server answers.
            let this = Arc::clone(self);
            let cid = conversation_id.clone();
            tokio::spawn(async move {
                match this.gateway.get_unread_count(&cid).await {
                    Ok(count) => this.dispatch(Action::SetUnreadCount {
                        conversation_id: cid,
                        count,
                    }),
                    Err(e) => tracing::debug!("sync: unread count fetch for {cid} failed: {e:#}"),
                }
            });
        }

        let cache = self.message_cache.clone();
        let cid = conversation_id.clone();
        let cached_message = message.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.save(&cid, vec![cached_message]).await {
                tracing::warn!("sync: message cache write for {cid} failed: {e:#}");
            }
        });

        if needs_enrichment {
            self.spawn_enrichment(conversation_id, Some(message));
        }
        self.mark_snapshot_dirty();
    }

    fn spawn_enrichment(self: &Arc<Self>, conversation_id: String, message: Option<Message>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let current_user_id = this.state.read().current_user_id.clone();
            if let Some(conversation) = this
                .enrichment
                .enrich(&conversation_id, &current_user_id, message)
                .await
            {
                this.dispatch(Action::UpdateConversation(conversation));
                this.mark_snapshot_dirty();
            }
            // On None the minimal conversation stays; nothing else to do.
        });
    }

    async fn resolve_new_last_message(self: &Arc<Self>, conversation_id: &str, deleted_id: &str) {
        match self
            .gateway
            .get_messages(conversation_id, 1, None, Some(deleted_id))
            .await
        {
            Ok(messages) => {
                let Some(previous) = messages.into_iter().last() else {
                    return;
                };
                let conversation = self.state.read().get(conversation_id).cloned();
                if let Some(mut conversation) = conversation {
                    conversation.last_message = Some(previous);
                    self.dispatch(Action::UpdateConversation(conversation));
                    self.mark_snapshot_dirty();
                }
            }
            Err(e) => {
                tracing::debug!("sync: previous-message fetch for {conversation_id} failed: {e:#}")
            }
        }
    }

    async fn on_reconnect(self: &Arc<Self>) {
        let last_sync = self.last_sync_at.load(Ordering::SeqCst);
        let stale = last_sync == 0
            || now_millis().saturating_sub(last_sync)
                > self.config.reconnect_stale_after.as_millis() as u64;
        let unhealthy = !self.channel_healthy.load(Ordering::SeqCst);

        if unhealthy || stale {
            match self.gateway.get_conversations_updated_since(last_sync).await {
                Ok(conversations) => {
                    tracing::info!("sync: reconciling {} conversations after reconnect", conversations.len());
                    self.dispatch(Action::SyncFromServer(conversations));
                    self.last_sync_at.store(now_millis(), Ordering::SeqCst);
                    self.mark_snapshot_dirty();
                }
                Err(e) => tracing::warn!("sync: reconnect reconciliation failed: {e:#}"),
            }
        } else {
            tracing::debug!("sync: reconnect with healthy channel and recent sync — skipping reconciliation");
        }
        self.channel_healthy.store(true, Ordering::SeqCst);
    }

    fn spawn_incremental_message_sync(self: &Arc<Self>, conversation_id: &str, after_id: Option<String>) {
        let Some(after_id) = after_id else { return };
        let this = Arc::clone(self);
        let conversation_id = conversation_id.to_string();
        tokio::spawn(async move {
            match this
                .gateway
                .get_messages(
                    &conversation_id,
                    this.config.message_window_size,
                    Some(&after_id),
                    None,
                )
                .await
            {
                Ok(new_messages) if !new_messages.is_empty() => {
                    if let Err(e) = this.message_cache.save(&conversation_id, new_messages).await {
                        tracing::warn!("sync: incremental cache write for {conversation_id} failed: {e:#}");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!("sync: incremental fetch for {conversation_id} failed: {e:#}")
                }
            }
        });
    }

    /// Debounced snapshot persistence: mark dirty, and schedule one flush
    /// after a quiet period unless one is already pending.
    fn mark_snapshot_dirty(self: &Arc<Self>) {
        self.snapshot_dirty.store(true, Ordering::SeqCst);
        if self.flush_scheduled.swap(true, Ordering::SeqCst) {
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(this.config.snapshot_flush_debounce).await;
            this.flush_scheduled.store(false, Ordering::SeqCst);
            if let Err(e) = this.flush().await {
                tracing::warn!("sync: debounced snapshot flush failed: {e:#}");
            }
        });
    }

    /// Dirty-marking for call sites that only have `&self`; the flush rides
    /// on the next scheduled one or on `flush()`.
    fn mark_snapshot_dirty_plain(&self) {
        self.snapshot_dirty.store(true, Ordering::SeqCst);
    }
}
