//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

// == Cache Entry ==
/// Represents a single cache entry with value and expiry metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Store timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Time to live in milliseconds
    pub ttl_ms: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stored at `stored_at`.
    pub fn new(value: V, stored_at: u64, ttl_ms: u64) -> Self {
        Self {
            value,
            stored_at,
            ttl_ms,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at time `now`.
    ///
    /// An entry stays readable while `now - stored_at <= ttl_ms` and is
    /// expired from the first millisecond past that.
    pub fn is_expired_at(&self, now: u64) -> bool {
        now.saturating_sub(self.stored_at) > self.ttl_ms
    }

    // == Expires At ==
    /// Last millisecond at which the entry is still readable.
    pub fn expires_at(&self) -> u64 {
        self.stored_at.saturating_add(self.ttl_ms)
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds at time `now` (0 once expired).
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        self.expires_at().saturating_sub(now)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("test_value".to_string(), 1_000, 500);

        assert_eq!(entry.value, "test_value");
        assert_eq!(entry.stored_at, 1_000);
        assert_eq!(entry.expires_at(), 1_500);
        assert!(!entry.is_expired_at(1_000));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("v", 1_000, 1_000);

        // Exactly ttl elapsed is still readable
        assert!(!entry.is_expired_at(2_000));
        // One millisecond past is expired
        assert!(entry.is_expired_at(2_001));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new("v", 0, 10_000);

        assert_eq!(entry.ttl_remaining_ms(0), 10_000);
        assert_eq!(entry.ttl_remaining_ms(9_000), 1_000);
        assert_eq!(entry.ttl_remaining_ms(20_000), 0);
    }

    #[test]
    fn test_clock_before_store_time_is_not_expired() {
        let entry = CacheEntry::new("v", 5_000, 0);
        assert!(!entry.is_expired_at(4_000));
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let entry = CacheEntry::new("v", 10, u64::MAX);
        assert_eq!(entry.expires_at(), u64::MAX);
        assert!(!entry.is_expired_at(u64::MAX));
    }
}
