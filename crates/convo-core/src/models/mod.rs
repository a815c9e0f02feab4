mod conversation;
mod member;
mod message;

pub use conversation::Conversation;
pub use member::Member;
pub use message::{ImageInfo, Message, MessageKind};

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn message(id: &str, conversation_id: &str, sender_id: &str, created_at: u64) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            body: Some(format!("body of {id}")),
            kind: MessageKind::Text,
            image: None,
            edited: false,
            deleted: false,
            created_at,
            updated_at: created_at,
            sender_name: None,
            sender_avatar_url: None,
        }
    }

    pub fn conversation(id: &str, updated_at: u64) -> Conversation {
        Conversation {
            id: id.to_string(),
            title: Some(format!("conversation {id}")),
            is_direct: true,
            metadata: serde_json::Map::new(),
            created_by: "u-creator".to_string(),
            created_at: updated_at,
            updated_at,
            last_message: None,
            unread_count: 0,
            other_user: None,
            members: Vec::new(),
        }
    }

    pub fn member(conversation_id: &str, user_id: &str) -> Member {
        Member {
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            role: "member".to_string(),
            joined_at: 0,
            last_read_at: None,
            display_name: Some(format!("user {user_id}")),
            avatar_url: None,
        }
    }
}
