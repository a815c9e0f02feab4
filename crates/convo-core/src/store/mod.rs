mod conversation_store;
mod list_cache;
mod message_cache;

pub use conversation_store::{apply, Action, ConversationState};
pub use list_cache::{CachedConversationSnapshot, ConversationListCache, SNAPSHOT_SCHEMA_VERSION};
pub use message_cache::{merge_messages, CachedMessageWindow, MessageCache, WINDOW_SCHEMA_VERSION};
