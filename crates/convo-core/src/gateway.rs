use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::events::LiveUpdate;
use crate::models::{Conversation, Message};

/// The backend as the core sees it. Implementations own the wire protocol
/// (REST, websocket, whatever); the core only assumes paginated fetches, a
/// read receipt call, and a live-update channel.
///
/// Paginated fetches return plain vectors; the SyncCoordinator requests
/// `limit + 1` and derives "has more" from the overflow row, so gateways
/// never need a separate count query.
#[async_trait]
pub trait BackendGateway: Send + Sync + 'static {
    async fn get_conversations(&self, limit: usize, offset: usize) -> Result<Vec<Conversation>>;

    /// Single fully-populated conversation (members included). `None` when
    /// the id is unknown to the server. This is the fetch enrichment runs.
    async fn get_conversation(&self, conversation_id: &str) -> Result<Option<Conversation>>;

    /// Messages for one conversation, newest-last. `after_id` fetches forward
    /// from a known message (incremental sync); `before_id` fetches history
    /// backwards (pagination).
    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: usize,
        after_id: Option<&str>,
        before_id: Option<&str>,
    ) -> Result<Vec<Message>>;

    /// Conversations whose `updated_at` is newer than `since` (Unix millis).
    /// Drives reconnect reconciliation.
    async fn get_conversations_updated_since(&self, since: u64) -> Result<Vec<Conversation>>;

    async fn get_unread_count(&self, conversation_id: &str) -> Result<u32>;

    async fn mark_as_read(&self, conversation_id: &str) -> Result<()>;

    /// Live-update channel. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> mpsc::Receiver<LiveUpdate>;
}
