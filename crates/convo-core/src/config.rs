use std::time::Duration;

use crate::constants;
use crate::retry::BackoffPolicy;

/// Tunables for the sync/cache core. `Default` matches the values in
/// `constants.rs`; construct one explicitly to override for tests or
/// low-memory devices.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub page_size: usize,
    pub message_window_size: usize,
    pub memory_tier_capacity: usize,
    pub cache_byte_budget: u64,
    pub message_window_ttl: Duration,
    pub access_score_weight: f64,
    pub seen_window_capacity: usize,
    pub reconnect_stale_after: Duration,
    pub snapshot_flush_debounce: Duration,
    pub enrichment_backoff: BackoffPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            page_size: constants::PAGE_SIZE,
            message_window_size: constants::MESSAGE_WINDOW_SIZE,
            memory_tier_capacity: constants::MEMORY_TIER_CAPACITY,
            cache_byte_budget: constants::CACHE_BYTE_BUDGET,
            message_window_ttl: constants::MESSAGE_WINDOW_TTL,
            access_score_weight: constants::ACCESS_SCORE_WEIGHT,
            seen_window_capacity: constants::SEEN_WINDOW_CAPACITY,
            reconnect_stale_after: constants::RECONNECT_STALE_AFTER,
            snapshot_flush_debounce: constants::SNAPSHOT_FLUSH_DEBOUNCE,
            enrichment_backoff: BackoffPolicy::new(
                constants::ENRICHMENT_MAX_ATTEMPTS,
                constants::ENRICHMENT_BASE_BACKOFF,
            ),
        }
    }
}
