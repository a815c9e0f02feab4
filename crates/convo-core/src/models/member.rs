use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub conversation_id: String,
    pub user_id: String,
    pub role: String,
    /// Unix milliseconds.
    pub joined_at: u64,
    pub last_read_at: Option<u64>,
    /// Enrichment-derived; absent on stubs synthesized from a bare message.
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}
