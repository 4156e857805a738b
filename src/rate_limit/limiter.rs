//! Fixed-window request counter.

use dashmap::DashMap;

use crate::clock::{system_clock, SharedClock};

const MINUTE_MS: u64 = 60 * 1000;

// == Rate Limit Config ==
/// Window and key policy of one limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Window length (ms)
    pub window_ms: u64,
    /// Requests allowed per window
    pub max_requests: u32,
    /// Successful (2xx) responses are not counted
    pub skip_successful_requests: bool,
    /// Namespace of this limiter's client keys
    pub key_prefix: String,
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            window_ms,
            max_requests,
            skip_successful_requests: false,
            key_prefix: "rl".to_string(),
        }
    }

    /// Admin endpoints: 100 requests per 15 minutes.
    pub fn admin() -> Self {
        Self {
            key_prefix: "admin".to_string(),
            ..Self::new(100, 15 * MINUTE_MS)
        }
    }

    /// Sensitive operations: 10 failed requests per 15 minutes.
    pub fn sensitive() -> Self {
        Self {
            skip_successful_requests: true,
            key_prefix: "sensitive".to_string(),
            ..Self::new(10, 15 * MINUTE_MS)
        }
    }
}

/// Counter of one client in its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_reset_at_ms: u64,
}

impl RateLimitRecord {
    /// Empty window opening at `now`.
    fn start(now: u64, window_ms: u64) -> Self {
        Self {
            count: 0,
            window_reset_at_ms: now.saturating_add(window_ms),
        }
    }
}

/// Outcome of one [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the window resets; zero when allowed
    pub retry_after_ms: u64,
    pub window_reset_at_ms: u64,
}

impl RateLimitDecision {
    /// Whole seconds to wait, rounded up, never zero.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after_ms.div_ceil(1000).max(1)
    }
}

// == Rate Limiter ==
/// Fixed-window limiter keyed by client identity.
///
/// The first request of a client, or the first after its window elapsed,
/// opens a new window. Every allowed request is counted, and requests are
/// denied once the count has reached the limit.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    records: DashMap<String, RateLimitRecord>,
    clock: SharedClock,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            config,
            records: DashMap::new(),
            clock,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Counts a request of `client` against the configured window.
    pub fn check(&self, client: &str) -> RateLimitDecision {
        self.check_with(client, self.config.window_ms, self.config.max_requests)
    }

    /// Counts a request of `client` against an explicit window and limit.
    pub fn check_with(&self, client: &str, window_ms: u64, max_requests: u32) -> RateLimitDecision {
        let now = self.clock.now_ms();
        let mut record = self
            .records
            .entry(self.record_key(client))
            .or_insert_with(|| RateLimitRecord::start(now, window_ms));

        if now > record.window_reset_at_ms {
            *record = RateLimitRecord::start(now, window_ms);
        }

        // A zero limit denies even the first request of a window
        if record.count >= max_requests {
            return RateLimitDecision {
                allowed: false,
                limit: max_requests,
                remaining: 0,
                retry_after_ms: record.window_reset_at_ms.saturating_sub(now).max(1),
                window_reset_at_ms: record.window_reset_at_ms,
            };
        }
        record.count += 1;

        RateLimitDecision {
            allowed: true,
            limit: max_requests,
            remaining: max_requests.saturating_sub(record.count),
            retry_after_ms: 0,
            window_reset_at_ms: record.window_reset_at_ms,
        }
    }

    /// Uncounts one request of `client` made in the window ending at
    /// `window_reset_at_ms`. Does nothing once that window was replaced.
    pub fn release(&self, client: &str, window_reset_at_ms: u64) {
        if let Some(mut record) = self.records.get_mut(&self.record_key(client)) {
            if record.window_reset_at_ms == window_reset_at_ms {
                record.count = record.count.saturating_sub(1);
            }
        }
    }

    /// Current record of `client`, if any.
    pub fn record(&self, client: &str) -> Option<RateLimitRecord> {
        self.records.get(&self.record_key(client)).map(|r| *r)
    }

    /// Drops records whose window has elapsed; returns how many.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;
        self.records.retain(|_, record| {
            let live = now <= record.window_reset_at_ms;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.records.len()
    }

    fn record_key(&self, client: &str) -> String {
        format!("{}:{client}", self.config.key_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn limiter(max_requests: u32, window_ms: u64) -> (Arc<ManualClock>, RateLimiter) {
        let (clock, shared) = ManualClock::shared(1_000);
        let limiter = RateLimiter::with_clock(RateLimitConfig::new(max_requests, window_ms), shared);
        (clock, limiter)
    }

    #[test]
    fn test_presets() {
        let admin = RateLimitConfig::admin();
        assert_eq!((admin.max_requests, admin.window_ms), (100, 900_000));
        assert!(!admin.skip_successful_requests);

        let sensitive = RateLimitConfig::sensitive();
        assert_eq!((sensitive.max_requests, sensitive.window_ms), (10, 900_000));
        assert!(sensitive.skip_successful_requests);
        assert_ne!(admin.key_prefix, sensitive.key_prefix);
    }

    #[test]
    fn test_five_allowed_sixth_denied() {
        let (clock, limiter) = limiter(5, 60_000);

        for expected_remaining in [4, 3, 2, 1, 0] {
            let decision = limiter.check("ip:1.2.3.4");
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
            clock.advance(100);
        }

        let denied = limiter.check("ip:1.2.3.4");
        assert!(!denied.allowed);
        assert!(denied.retry_after_ms > 0);
        assert_eq!(denied.retry_after_ms, 60_000 - 500);
        assert_eq!(denied.retry_after_secs(), 60);
    }

    #[test]
    fn test_zero_limit_denies_every_request() {
        let (clock, limiter) = limiter(0, 60_000);

        let first = limiter.check("ip:1.2.3.4");
        assert!(!first.allowed);
        assert_eq!(first.remaining, 0);
        assert_eq!(first.retry_after_ms, 60_000);

        clock.advance(60_001);
        assert!(!limiter.check("ip:1.2.3.4").allowed);
    }

    #[test]
    fn test_clients_are_independent() {
        let (_clock, limiter) = limiter(1, 60_000);

        assert!(limiter.check("a").allowed);
        assert!(!limiter.check("a").allowed);
        assert!(limiter.check("b").allowed);
    }

    #[test]
    fn test_window_elapses() {
        let (clock, limiter) = limiter(2, 1_000);

        limiter.check("a");
        limiter.check("a");
        assert!(!limiter.check("a").allowed);

        clock.advance(1_000);
        assert!(!limiter.check("a").allowed, "reset instant still belongs to the window");

        clock.advance(1);
        let decision = limiter.check("a");
        assert!(decision.allowed);
        assert_eq!(limiter.record("a").unwrap().count, 1);
        assert_eq!(decision.window_reset_at_ms, 3_001);
    }

    #[test]
    fn test_check_with_overrides_config() {
        let (_clock, limiter) = limiter(100, 60_000);

        assert!(limiter.check_with("a", 60_000, 1).allowed);
        assert!(!limiter.check_with("a", 60_000, 1).allowed);
    }

    #[test]
    fn test_release_only_in_same_window() {
        let (clock, limiter) = limiter(1, 1_000);

        let first = limiter.check("a");
        limiter.release("a", first.window_reset_at_ms);
        assert_eq!(limiter.record("a").unwrap().count, 0);
        assert!(limiter.check("a").allowed);

        limiter.release("a", first.window_reset_at_ms);
        limiter.release("a", first.window_reset_at_ms);
        assert_eq!(limiter.record("a").unwrap().count, 0, "saturates at zero");

        limiter.check("a");
        clock.advance(2_000);
        let next = limiter.check("a");
        limiter.release("a", first.window_reset_at_ms);
        assert_eq!(limiter.record("a").unwrap().count, 1);
        assert_ne!(next.window_reset_at_ms, first.window_reset_at_ms);
    }

    #[test]
    fn test_cleanup_expired() {
        let (clock, limiter) = limiter(5, 1_000);

        limiter.check("old");
        clock.advance(600);
        limiter.check("new");
        clock.advance(500);

        assert_eq!(limiter.cleanup_expired(), 1);
        assert!(limiter.record("old").is_none());
        assert!(limiter.record("new").is_some());
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
