use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

use crate::cache::{CacheStats, Payload, ResponseCache};

/// In-memory TTL cache.
///
/// Expiry is checked on every read (an expired entry is removed and counted
/// as a miss); [`ResponseCache::purge_expired`] sweeps the rest. With a
/// capacity set, inserting past it evicts the oldest-inserted entries.
pub struct MemoryCache {
    inner: Mutex<State>,
    max_entries: Option<usize>,
}

struct CacheEntry {
    value: Payload,
    stored_at: Instant,
    ttl: Duration,
    cached_at: DateTime<Utc>,
    seq: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= self.ttl
    }
}

#[derive(Default)]
struct State {
    map: HashMap<String, CacheEntry>,
    // insertion order; stale (key, seq) pairs are skipped on eviction
    order: VecDeque<(String, u64)>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl State {
    fn evict_over(&mut self, cap: usize) {
        while self.map.len() > cap {
            let Some((key, seq)) = self.order.pop_front() else {
                break;
            };
            if self.map.get(&key).map(|e| e.seq) == Some(seq) {
                self.map.remove(&key);
                self.evictions += 1;
            }
        }
    }

    fn compact_order(&mut self) {
        if self.order.len() > self.map.len() * 2 + 64 {
            let map = &self.map;
            self.order
                .retain(|(key, seq)| map.get(key).map(|e| e.seq) == Some(*seq));
        }
    }
}

impl MemoryCache {
    /// Create an unbounded cache
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(State::default()),
            max_entries: None,
        }
    }

    /// Create a cache holding at most `max_entries` entries
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(State::default()),
            max_entries: Some(max_entries.max(1)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Payload> {
        let now = Instant::now();
        let mut st = self.inner.lock();

        let lookup = st
            .map
            .get(key)
            .map(|entry| (entry.is_expired(now), entry.value.clone()));

        match lookup {
            Some((false, value)) => {
                st.hits += 1;
                Some(value)
            }
            Some((true, _)) => {
                st.map.remove(key);
                st.expirations += 1;
                st.misses += 1;
                None
            }
            None => {
                st.misses += 1;
                None
            }
        }
    }

    fn set(&self, key: &str, value: Payload, ttl: Duration) {
        let mut st = self.inner.lock();
        let seq = st.next_seq;
        st.next_seq += 1;

        st.map.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
                cached_at: Utc::now(),
                seq,
            },
        );
        st.order.push_back((key.to_string(), seq));

        if let Some(cap) = self.max_entries {
            st.evict_over(cap);
        }
        st.compact_order();
    }

    fn invalidate(&self, key: &str) -> bool {
        self.inner.lock().map.remove(key).is_some()
    }

    fn clear(&self) {
        let mut st = self.inner.lock();
        st.map.clear();
        st.order.clear();
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut st = self.inner.lock();

        let before = st.map.len();
        st.map.retain(|_, entry| !entry.is_expired(now));
        let purged = before - st.map.len();

        st.expirations += purged as u64;
        st.compact_order();
        purged
    }

    fn stats(&self) -> CacheStats {
        let st = self.inner.lock();

        CacheStats {
            entries: st.map.len(),
            hits: st.hits,
            misses: st.misses,
            evictions: st.evictions,
            expirations: st.expirations,
            oldest_entry: st.map.values().map(|e| e.cached_at).min(),
            newest_entry: st.map.values().map(|e| e.cached_at).max(),
        }
    }
}
