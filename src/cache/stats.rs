//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of one cache store's counters and footprint.
///
/// Hit and miss counters are cumulative for the store's lifetime and survive
/// `clear`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Current number of entries
    pub size: usize,
    /// Entry count ceiling
    pub max_size: usize,
    /// Number of successful cache retrievals
    pub total_hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub total_misses: u64,
    /// hits / (hits + misses), 0.0 before the first read
    pub hit_rate: f64,
    /// Rough byte footprint of keys and values
    pub memory_usage_estimate: usize,
    /// Entries removed to make room for new ones
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expired_removed: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn compute_hit_rate(&self) -> f64 {
        let total = self.total_hits + self.total_misses;
        if total == 0 {
            0.0
        } else {
            self.total_hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.total_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.total_misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expired(&mut self, count: usize) {
        self.expired_removed += count as u64;
    }
}

// == Size Estimate ==
/// Approximate in-memory footprint of a cached value, in bytes.
pub trait SizeEstimate {
    fn estimated_size(&self) -> usize;
}

impl SizeEstimate for String {
    fn estimated_size(&self) -> usize {
        self.len()
    }
}

impl SizeEstimate for serde_json::Value {
    fn estimated_size(&self) -> usize {
        // Serialized length is a stable stand-in for heap usage.
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}
