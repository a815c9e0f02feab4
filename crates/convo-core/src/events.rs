use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::models::Message;

/// Push events delivered over the backend's live channel.
///
/// The channel may duplicate, reorder, or deliver events for conversations
/// the client has never seen; the SyncCoordinator dedupes and routes them
/// into the reducer.
#[derive(Debug, Clone)]
pub enum LiveUpdate {
    NewMessage {
        conversation_id: String,
        message: Message,
    },
    MessageUpdated {
        conversation_id: String,
        message: Message,
    },
    MessageDeleted {
        conversation_id: String,
        message_id: String,
    },
    ConversationUpdated {
        conversation_id: String,
        updated_at: u64,
    },
    /// The transport re-established its connection; events may have been
    /// missed while it was down.
    Reconnected,
}

impl LiveUpdate {
    /// Identity used by the recently-seen dedupe window. Updates and deletes
    /// carry a discriminant so an edit arriving after the original delivery
    /// of the same message id is not swallowed as a duplicate. Edits are
    /// keyed on their content rather than `updated_at`: timestamps are
    /// millisecond-granular, so two distinct edits can share one.
    pub fn dedupe_key(&self) -> Option<String> {
        match self {
            LiveUpdate::NewMessage { message, .. } => Some(format!("new:{}", message.id)),
            LiveUpdate::MessageUpdated { message, .. } => {
                let mut hasher = DefaultHasher::new();
                message.body.hash(&mut hasher);
                message.edited.hash(&mut hasher);
                message.deleted.hash(&mut hasher);
                Some(format!("upd:{}:{:x}", message.id, hasher.finish()))
            }
            LiveUpdate::MessageDeleted { message_id, .. } => Some(format!("del:{message_id}")),
            // Conversation updates and reconnects are idempotent in the
            // reducer; no dedupe needed.
            LiveUpdate::ConversationUpdated { .. } | LiveUpdate::Reconnected => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    #[test]
    fn test_same_millisecond_edits_get_distinct_dedupe_keys() {
        let mut first = fixtures::message("m1", "conv-a", "peer", 1_000);
        first.body = Some("first revision".into());
        first.edited = true;
        first.updated_at = 2_000;
        let mut second = first.clone();
        second.body = Some("second revision".into());

        let key_a = LiveUpdate::MessageUpdated {
            conversation_id: "conv-a".into(),
            message: first,
        }
        .dedupe_key();
        let key_b = LiveUpdate::MessageUpdated {
            conversation_id: "conv-a".into(),
            message: second,
        }
        .dedupe_key();
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn test_redelivered_edit_shares_its_dedupe_key() {
        let mut msg = fixtures::message("m1", "conv-a", "peer", 1_000);
        msg.body = Some("revision".into());
        msg.edited = true;

        let key_a = LiveUpdate::MessageUpdated {
            conversation_id: "conv-a".into(),
            message: msg.clone(),
        }
        .dedupe_key();
        let key_b = LiveUpdate::MessageUpdated {
            conversation_id: "conv-a".into(),
            message: msg,
        }
        .dedupe_key();
        assert_eq!(key_a, key_b);
    }

    #[test]
    fn test_edit_and_original_delivery_do_not_collide() {
        let msg = fixtures::message("m1", "conv-a", "peer", 1_000);
        let new_key = LiveUpdate::NewMessage {
            conversation_id: "conv-a".into(),
            message: msg.clone(),
        }
        .dedupe_key();
        let upd_key = LiveUpdate::MessageUpdated {
            conversation_id: "conv-a".into(),
            message: msg,
        }
        .dedupe_key();
        assert_ne!(new_key, upd_key);
    }
}
