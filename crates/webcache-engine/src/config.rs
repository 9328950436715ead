//! Engine configuration knobs

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the cache coordination protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How often a sleeping loser re-checks the cache for updates
    pub poll_interval: Duration,
    /// Seconds of backoff window per known competing worker
    pub backoff_multiply_secs: u64,
    /// Upper bound on the backoff window
    pub backoff_max_secs: u64,
    /// Attempts before a reservation or publication loop gives up
    pub update_max_attempts: u32,
    /// How long a cache entry stays fresh after a fetch
    pub expire_secs: i64,
    /// Drop origin responses with status >= 400 instead of caching them
    pub drop_not_ok_status: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            backoff_multiply_secs: 5,
            backoff_max_secs: 30,
            update_max_attempts: 20,
            expire_secs: 30,
            drop_not_ok_status: true,
        }
    }
}

impl EngineConfig {
    /// Size of the randomized backoff window in seconds, scaled by the
    /// number of workers currently waiting for an answer
    ///
    /// `reservation - last_noted` counts contenders observed since the
    /// last successful content publication.
    pub fn backoff_window_secs(&self, reservation: u64, last_noted: u64) -> u64 {
        let contenders = reservation.saturating_sub(last_noted);
        (contenders.saturating_mul(self.backoff_multiply_secs)).min(self.backoff_max_secs)
    }
}
