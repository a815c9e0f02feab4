use serde::{Deserialize, Serialize};

use super::{Member, Message};

/// A conversation as the UI sees it. Exactly one canonical copy lives in the
/// ConversationState; every other layer (caches, snapshots) holds copies that
/// are allowed to lag and are reconciled on the next sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: Option<String>,
    pub is_direct: bool,
    /// Opaque server-defined metadata; carried through untouched.
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_by: String,
    /// Unix milliseconds.
    pub created_at: u64,
    pub updated_at: u64,
    pub last_message: Option<Message>,
    pub unread_count: u32,
    /// The peer in a direct conversation; enrichment-derived.
    pub other_user: Option<Member>,
    pub members: Vec<Member>,
}

impl Conversation {
    /// Synthesize a minimal conversation from a single incoming message when
    /// no prior record exists. Best-effort fields only; enrichment fills in
    /// the rest later. The message is the one thing that must never be lost.
    pub fn minimal_from_message(message: Message, current_user_id: &str) -> Self {
        let from_peer = message.sender_id != current_user_id;
        let other_user = from_peer.then(|| Member {
            conversation_id: message.conversation_id.clone(),
            user_id: message.sender_id.clone(),
            role: "member".to_string(),
            joined_at: message.created_at,
            last_read_at: None,
            display_name: message.sender_name.clone(),
            avatar_url: message.sender_avatar_url.clone(),
        });

        Self {
            id: message.conversation_id.clone(),
            title: None,
            is_direct: true,
            metadata: serde_json::Map::new(),
            created_by: message.sender_id.clone(),
            created_at: message.created_at,
            updated_at: message.created_at,
            unread_count: if from_peer { 1 } else { 0 },
            other_user,
            members: Vec::new(),
            last_message: Some(message),
        }
    }

    /// True while the conversation is still a stub waiting on enrichment.
    pub fn is_under_enriched(&self) -> bool {
        self.members.is_empty()
    }
}
