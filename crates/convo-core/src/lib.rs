pub mod config;
pub mod constants;
pub mod enrichment;
pub mod events;
pub mod gateway;
pub mod kv;
pub mod models;
pub mod retry;
pub mod store;
pub mod sync;
pub mod tracing_setup;

pub use config::CoreConfig;
pub use events::LiveUpdate;
pub use gateway::BackendGateway;
pub use kv::{DurableKeyValueStore, FsKeyValueStore, MemoryKeyValueStore};
pub use store::{Action, ConversationState, MessageCache};
pub use sync::SyncCoordinator;

/// Current wall-clock time as Unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
