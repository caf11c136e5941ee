pub mod memory;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use memory::MemoryCache;

/// Opaque upstream payload as stored in the cache
pub type Payload = Arc<serde_json::Value>;

/// Trait for response cache implementations.
///
/// All methods are synchronous and must not block on I/O: they run inline
/// on every request path.
pub trait ResponseCache: Send + Sync {
    /// Fresh value for `key`; expired entries are dropped and reported as a miss
    fn get(&self, key: &str) -> Option<Payload>;

    /// Store `value` under `key` for `ttl`
    fn set(&self, key: &str, value: Payload, ttl: Duration);

    /// Remove one entry, returning whether it existed
    fn invalidate(&self, key: &str) -> bool;

    /// Remove every entry
    fn clear(&self);

    /// Drop all expired entries, returning how many were removed
    fn purge_expired(&self) -> usize;

    /// Get cache statistics
    fn stats(&self) -> CacheStats;
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped because the cache was over capacity
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Periodically purge expired entries until `shutdown` fires
pub fn spawn_sweeper(
    cache: Arc<dyn ResponseCache>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let purged = cache.purge_expired();
                    if purged > 0 {
                        tracing::debug!("🧹 Cache sweep removed {} expired entries", purged);
                    }
                }
            }
        }

        tracing::debug!("Cache sweeper stopped");
    })
}
