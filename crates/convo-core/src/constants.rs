use std::time::Duration;

/// Number of messages kept per conversation in a cached window.
/// Truncation happens only at the persistence boundary (see MessageCache::save).
pub const MESSAGE_WINDOW_SIZE: usize = 50;

/// Number of conversations the in-memory message tier holds before LRU eviction.
pub const MEMORY_TIER_CAPACITY: usize = 20;

/// Total byte budget for all durable message windows combined.
pub const CACHE_BYTE_BUDGET: u64 = 4 * 1024 * 1024;

/// Maximum age of a durable message window before it is treated as a miss.
pub const MESSAGE_WINDOW_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Multiplier applied to a window's access count when scoring eviction
/// candidates. Higher weight keeps frequently-read conversations longer.
pub const ACCESS_SCORE_WEIGHT: f64 = 2.0;

/// Conversations fetched per page.
pub const PAGE_SIZE: usize = 20;

/// Size of the recently-seen-event-id window used to drop duplicate live updates.
pub const SEEN_WINDOW_CAPACITY: usize = 256;

/// Elapsed time since the last successful sync after which a reconnect
/// forces full reconciliation. A tunable heuristic, not a correctness bound.
pub const RECONNECT_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

/// Quiet period before a dirty conversation-list snapshot is flushed to disk.
pub const SNAPSHOT_FLUSH_DEBOUNCE: Duration = Duration::from_secs(2);

/// Enrichment retry bounds.
pub const ENRICHMENT_MAX_ATTEMPTS: u32 = 3;
pub const ENRICHMENT_BASE_BACKOFF: Duration = Duration::from_millis(500);
