//! The conversation reducer — single source of truth for the ordered
//! conversation list.
//!
//! `apply` is a pure state transition: no I/O, no clocks, deterministic for a
//! given (state, action) pair. Every other component mutates the list only by
//! dispatching actions here, so no reader ever observes a torn list.
//!
//! Ordering discipline: conversations are kept newest-first by `updated_at`,
//! but maintained by O(n) head moves on the hot paths. A full resort happens
//! only where genuinely new entries appear (`ReplaceAll` with additions) or
//! on the rare reconnect reconciliation (`SyncFromServer`).

use crate::models::{Conversation, Message};

/// Canonical in-memory conversation list plus the identity needed to decide
/// unread attribution for synthesized conversations.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub conversations: Vec<Conversation>,
    pub current_user_id: String,
}

impl ConversationState {
    pub fn new(current_user_id: impl Into<String>) -> Self {
        Self {
            conversations: Vec::new(),
            current_user_id: current_user_id.into(),
        }
    }

    pub fn get(&self, conversation_id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == conversation_id)
    }

    /// Sum of unread counts, as shown on the inbox tab badge.
    pub fn unread_total(&self) -> u32 {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    fn position(&self, conversation_id: &str) -> Option<usize> {
        self.conversations.iter().position(|c| c.id == conversation_id)
    }

    /// Splice the entry at `index` out and reinsert it at the head.
    fn move_to_head(&mut self, index: usize) {
        if index > 0 {
            let conversation = self.conversations.remove(index);
            self.conversations.insert(0, conversation);
        }
    }

    fn sort_by_updated_at(&mut self) {
        self.conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    /// A message arrived over the live channel (or was sent locally).
    NewMessage {
        conversation_id: String,
        message: Message,
    },
    /// An existing message was edited. Only relevant to the list when it is
    /// the conversation's last message.
    MessageUpdated {
        conversation_id: String,
        message: Message,
    },
    MessageDeleted {
        conversation_id: String,
        message_id: String,
    },
    /// Conversation-level metadata changed server-side.
    ConversationUpdated {
        conversation_id: String,
        updated_at: u64,
    },
    /// Local optimistic bump; overwritten by the next `SetUnreadCount`.
    IncrementUnread { conversation_id: String },
    /// Server-confirmed count; always wins over pending increments.
    SetUnreadCount { conversation_id: String, count: u32 },
    /// Merge a fully- (or better-) populated conversation, e.g. an enrichment
    /// result. Never a blind replace.
    UpdateConversation(Conversation),
    /// First page of a cold load.
    ReplaceAll(Vec<Conversation>),
    /// Subsequent pages.
    AppendConversations(Vec<Conversation>),
    /// Reconnect reconciliation: server wins for every id it reports.
    SyncFromServer(Vec<Conversation>),
}

pub fn apply(state: &mut ConversationState, action: Action) {
    match action {
        Action::NewMessage {
            conversation_id,
            message,
        } => apply_new_message(state, &conversation_id, message),

        Action::MessageUpdated {
            conversation_id,
            message,
        } => {
            let Some(index) = state.position(&conversation_id) else {
                return;
            };
            let conversation = &mut state.conversations[index];
            match &conversation.last_message {
                Some(last) if last.id == message.id && last.content_differs(&message) => {
                    conversation.last_message = Some(message);
                }
                // Not the last message, or nothing actually changed.
                _ => {}
            }
        }

        Action::MessageDeleted {
            conversation_id,
            message_id,
        } => {
            let Some(index) = state.position(&conversation_id) else {
                return;
            };
            let conversation = &mut state.conversations[index];
            if conversation
                .last_message
                .as_ref()
                .is_some_and(|m| m.id == message_id)
            {
                // The caller resolves the new previous message asynchronously
                // and re-injects it via UpdateConversation.
                conversation.last_message = None;
            }
        }

        Action::ConversationUpdated {
            conversation_id,
            updated_at,
        } => {
            let Some(index) = state.position(&conversation_id) else {
                return;
            };
            if updated_at > state.conversations[index].updated_at {
                state.conversations[index].updated_at = updated_at;
                state.move_to_head(index);
            }
        }

        Action::IncrementUnread { conversation_id } => {
            if let Some(index) = state.position(&conversation_id) {
                state.conversations[index].unread_count += 1;
            }
        }

        Action::SetUnreadCount {
            conversation_id,
            count,
        } => {
            if let Some(index) = state.position(&conversation_id) {
                state.conversations[index].unread_count = count;
            }
        }

        Action::UpdateConversation(incoming) => {
            match state.position(&incoming.id) {
                Some(index) => {
                    merge_conversation(&mut state.conversations[index], incoming);
                    state.move_to_head(index);
                }
                None => state.conversations.insert(0, incoming),
            }
        }

        Action::ReplaceAll(incoming) => {
            if state.conversations.is_empty() {
                state.conversations = incoming;
                return;
            }
            // Smart merge: entries absent from this page may belong to a
            // later page not yet fetched, so they are kept, not dropped.
            let mut appended = false;
            for conversation in incoming {
                match state.position(&conversation.id) {
                    Some(index) => merge_conversation(&mut state.conversations[index], conversation),
                    None => {
                        state.conversations.push(conversation);
                        appended = true;
                    }
                }
            }
            // Sorting is the exception, not the default: only needed when new
            // conversations actually joined the list.
            if appended {
                state.sort_by_updated_at();
            }
        }

        Action::AppendConversations(incoming) => {
            for conversation in incoming {
                if state.position(&conversation.id).is_none() {
                    state.conversations.push(conversation);
                }
            }
        }

        Action::SyncFromServer(incoming) => {
            for mut conversation in incoming {
                match state.position(&conversation.id) {
                    Some(index) => {
                        let existing = &state.conversations[index];
                        // Server data wins, but an enrichment result the
                        // server copy happens to lack is kept.
                        if conversation.other_user.is_none() {
                            conversation.other_user = existing.other_user.clone();
                        }
                        state.conversations[index] = conversation;
                    }
                    None => state.conversations.push(conversation),
                }
            }
            // This path is rare (reconnect), so an unconditional resort is
            // acceptable here and nowhere else.
            state.sort_by_updated_at();
        }
    }
}

fn apply_new_message(state: &mut ConversationState, conversation_id: &str, message: Message) {
    let Some(index) = state.position(conversation_id) else {
        // Unknown conversation: the message must never be dropped, even
        // before enrichment has run. Synthesize a stub and show it.
        let current_user = state.current_user_id.clone();
        let minimal = Conversation::minimal_from_message(message, &current_user);
        state.conversations.insert(0, minimal);
        return;
    };

    let conversation = &mut state.conversations[index];
    if conversation
        .last_message
        .as_ref()
        .is_some_and(|m| m.id == message.id)
    {
        // Duplicate delivery.
        return;
    }

    conversation.updated_at = conversation.updated_at.max(message.created_at);
    conversation.last_message = Some(message);
    state.move_to_head(index);
}

/// Merge `incoming` into `existing`. Rules:
/// - `other_user` survives from whichever side has it.
/// - `last_message` and `updated_at` come from the side whose last message is
///   newer, so a stale enrichment result can never roll the list backwards.
/// - `unread_count` stays local; `SetUnreadCount` is the authoritative path.
fn merge_conversation(existing: &mut Conversation, incoming: Conversation) {
    let incoming_newer = match (&existing.last_message, &incoming.last_message) {
        (Some(current), Some(candidate)) => candidate.created_at >= current.created_at,
        (None, Some(_)) => true,
        (Some(_), None) => false,
        (None, None) => incoming.updated_at > existing.updated_at,
    };

    if incoming_newer {
        existing.last_message = incoming.last_message;
        existing.updated_at = existing.updated_at.max(incoming.updated_at);
    }

    if existing.other_user.is_none() {
        existing.other_user = incoming.other_user;
    }
    if !incoming.members.is_empty() {
        existing.members = incoming.members;
    }
    if incoming.title.is_some() {
        existing.title = incoming.title;
    }
    if !incoming.metadata.is_empty() {
        existing.metadata = incoming.metadata;
    }
    existing.is_direct = incoming.is_direct;
    existing.created_by = incoming.created_by;
    existing.created_at = incoming.created_at;
}
