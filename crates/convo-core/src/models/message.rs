use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
}

/// Metadata for image messages. The image bytes themselves live behind `url`;
/// upload/compression is handled outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    /// None for deleted messages and pure image messages.
    pub body: Option<String>,
    pub kind: MessageKind,
    pub image: Option<ImageInfo>,
    pub edited: bool,
    pub deleted: bool,
    /// Unix milliseconds.
    pub created_at: u64,
    pub updated_at: u64,
    /// Display fields resolved by enrichment; absent until the sender's
    /// profile has been fetched.
    pub sender_name: Option<String>,
    pub sender_avatar_url: Option<String>,
}

impl Message {
    /// True when `other` is the same message with meaningfully different
    /// content. Drives the MessageUpdated no-op check: cosmetic re-deliveries
    /// of an identical payload must not trigger downstream updates.
    pub fn content_differs(&self, other: &Message) -> bool {
        self.body != other.body || self.edited != other.edited || self.deleted != other.deleted
    }
}
