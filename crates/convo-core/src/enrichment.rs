//! Resolves minimal conversation stubs into fully-populated conversations.
//!
//! A burst of live messages for the same unknown conversation must not fan
//! out into duplicate fetches: concurrent callers for one conversation share
//! a single in-flight future and its outcome. Transient failures retry with
//! backoff; a conversation that still cannot be enriched yields `None`, and
//! the caller keeps showing the minimal stub rather than blocking delivery.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::gateway::BackendGateway;
use crate::models::{Conversation, Message};
use crate::retry::BackoffPolicy;

type SharedEnrichment = Shared<BoxFuture<'static, Option<Conversation>>>;

pub struct EnrichmentCoordinator<G: BackendGateway> {
    gateway: Arc<G>,
    backoff: BackoffPolicy,
    in_flight: parking_lot::Mutex<HashMap<String, SharedEnrichment>>,
}

impl<G: BackendGateway> EnrichmentCoordinator<G> {
    pub fn new(gateway: Arc<G>, backoff: BackoffPolicy) -> Self {
        Self {
            gateway,
            backoff,
            in_flight: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    /// Fetch and post-process the conversation, sharing the fetch with any
    /// concurrent caller for the same id. `message`, when given, is the live
    /// message that triggered enrichment; it is stamped with sender display
    /// fields and kept as `last_message` if it is newer than what the server
    /// returned.
    pub async fn enrich(
        &self,
        conversation_id: &str,
        current_user_id: &str,
        message: Option<Message>,
    ) -> Option<Conversation> {
        let (future, owner) = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(conversation_id) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let future = fetch_with_retries(
                        self.gateway.clone(),
                        conversation_id.to_string(),
                        current_user_id.to_string(),
                        message,
                        self.backoff,
                    )
                    .boxed()
                    .shared();
                    in_flight.insert(conversation_id.to_string(), future.clone());
                    (future, true)
                }
            }
        };

        let result = future.await;
        if owner {
            self.in_flight.lock().remove(conversation_id);
        }
        result
    }
}

async fn fetch_with_retries<G: BackendGateway>(
    gateway: Arc<G>,
    conversation_id: String,
    current_user_id: String,
    message: Option<Message>,
    backoff: BackoffPolicy,
) -> Option<Conversation> {
    for attempt in 0..backoff.max_attempts {
        match gateway.get_conversation(&conversation_id).await {
            Ok(Some(conversation)) => {
                return Some(finish(conversation, &current_user_id, message));
            }
            Ok(None) => {
                // Unknown to the server; retrying will not help.
                tracing::debug!("enrichment: conversation {conversation_id} not found on server");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    "enrichment: fetch for {conversation_id} failed (attempt {}/{}): {e:#}",
                    attempt + 1,
                    backoff.max_attempts
                );
                if attempt + 1 < backoff.max_attempts {
                    tokio::time::sleep(backoff.delay_after(attempt)).await;
                }
            }
        }
    }
    tracing::warn!(
        "enrichment: giving up on {conversation_id} after {} attempts",
        backoff.max_attempts
    );
    None
}

/// Derive the fields the list UI needs from the fetched conversation.
fn finish(
    mut conversation: Conversation,
    current_user_id: &str,
    message: Option<Message>,
) -> Conversation {
    if conversation.is_direct && conversation.other_user.is_none() {
        conversation.other_user = conversation
            .members
            .iter()
            .find(|m| m.user_id != current_user_id)
            .cloned();
    }

    if let Some(mut message) = message {
        let newer = conversation
            .last_message
            .as_ref()
            .is_none_or(|last| message.created_at >= last.created_at);
        if newer {
            if message.sender_name.is_none() {
                if let Some(sender) = conversation
                    .members
                    .iter()
                    .find(|m| m.user_id == message.sender_id)
                {
                    message.sender_name = sender.display_name.clone();
                    message.sender_avatar_url = sender.avatar_url.clone();
                }
            }
            conversation.updated_at = conversation.updated_at.max(message.created_at);
            conversation.last_message = Some(message);
        }
    }

    conversation
}
