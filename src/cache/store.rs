//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with recency tracking and TTL expiration.

use std::collections::HashMap;

use crate::cache::{CacheEntry, CacheStats, RecencyIndex, SizeEstimate};
use crate::clock::{system_clock, SharedClock};

/// Bookkeeping bytes charged per entry on top of key and value.
const ENTRY_OVERHEAD_BYTES: usize = std::mem::size_of::<u64>() * 2;

// == Cache Store ==
/// Bounded TTL map with least-recently-used eviction.
///
/// The store is single-owner (`&mut self`); [`CacheInstance`](crate::cache::CacheInstance)
/// wraps it in a lock for shared use.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Access order for eviction
    recency: RecencyIndex,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed (at least 1)
    max_size: usize,
    /// Default TTL in milliseconds for entries without explicit TTL
    default_ttl_ms: u64,
    clock: SharedClock,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_size` - Maximum number of entries; 0 is treated as 1
    /// * `default_ttl_ms` - Default TTL in milliseconds for entries without explicit TTL
    pub fn new(max_size: usize, default_ttl_ms: u64) -> Self {
        Self::with_clock(max_size, default_ttl_ms, system_clock())
    }

    /// Creates a store reading time from `clock`.
    pub fn with_clock(max_size: usize, default_ttl_ms: u64, clock: SharedClock) -> Self {
        Self {
            entries: HashMap::new(),
            recency: RecencyIndex::new(),
            stats: CacheStats::new(),
            max_size: max_size.max(1),
            default_ttl_ms,
            clock,
        }
    }

    // == Set ==
    /// Stores a key-value pair with optional TTL.
    ///
    /// If the key already exists, the value is overwritten and TTL is reset.
    /// A new key arriving at capacity first drops expired entries, then the
    /// least recently used ones, before it is inserted.
    pub fn set(&mut self, key: String, value: V, ttl_ms: Option<u64>) {
        let now = self.clock.now_ms();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.make_room(now);
        }

        let entry = CacheEntry::new(value, now, ttl_ms.unwrap_or(self.default_ttl_ms));
        self.recency.touch(&key);
        self.entries.insert(key, entry);
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value if found and not expired. Expired entries are
    /// removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();

        match self.entries.get(key) {
            Some(entry) if entry.is_expired_at(now) => {
                self.remove_entry(key);
                self.stats.record_expired(1);
                self.stats.record_miss();
                None
            }
            Some(entry) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                self.recency.touch(key);
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Contains ==
    /// Returns true if the key holds a live entry. Does not touch counters or recency.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// Returns whether an entry was removed; deleting a missing key is a no-op.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Clear ==
    /// Removes every entry. Hit and miss counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    // == Keys ==
    /// Snapshot of the keys holding live entries.
    pub fn keys(&self) -> Vec<String> {
        let now = self.clock.now_ms();
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        self.remove_expired(now)
    }

    /// Counts a read that never reached the map.
    pub(crate) fn record_miss(&mut self) {
        self.stats.record_miss();
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn default_ttl_ms(&self) -> u64 {
        self.default_ttl_ms
    }

    fn make_room(&mut self, now: u64) {
        self.remove_expired(now);

        while self.entries.len() >= self.max_size {
            match self.recency.pop_oldest() {
                Some(victim) => {
                    self.entries.remove(&victim);
                    self.stats.record_eviction();
                }
                None => break,
            }
        }
    }

    fn remove_expired(&mut self, now: u64) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expired(expired_keys.len());
        expired_keys.len()
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.recency.remove(key);
            true
        } else {
            false
        }
    }
}

impl<V: Clone + SizeEstimate> CacheStore<V> {
    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let memory_usage_estimate = self
            .entries
            .iter()
            .map(|(key, entry)| key.len() + entry.value.estimated_size() + ENTRY_OVERHEAD_BYTES)
            .sum();

        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            hit_rate: self.stats.compute_hit_rate(),
            memory_usage_estimate,
            ..self.stats.clone()
        }
    }
}
