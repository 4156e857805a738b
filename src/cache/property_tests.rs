//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store, invalidation and health invariants
//! over generated operation sequences.

use proptest::prelude::*;
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::cache::{CacheDomain, CacheRegistry, CacheStore};
use crate::clock::ManualClock;
use crate::config::{Config, HealthMonitorConfig};
use crate::health::{key_score, HealthMonitor, Impact, InvalidationStats};
use crate::invalidation::InvalidationService;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_DEFAULT_TTL_MS: u64 = 300_000;
const START_MS: u64 = 1_000_000;

fn test_store(max_entries: usize) -> (Arc<ManualClock>, CacheStore<String>) {
    let (clock, shared) = ManualClock::shared(START_MS);
    (clock, CacheStore::with_clock(max_entries, TEST_DEFAULT_TTL_MS, shared))
}

// == Strategies ==
/// Generates cache keys in the `domain:kind:id` shape
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}:[a-z0-9_]{1,16}".prop_map(|s| s)
}

fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,64}".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Advance { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
        (0u64..120_000).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

fn stats_with(count: u64, frequency: f64, config: &HealthMonitorConfig) -> InvalidationStats {
    InvalidationStats {
        count,
        last_invalidation: START_MS,
        frequency,
        impact: Impact::classify(frequency, config),
        reasons: VecDeque::new(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hit and miss counters match the outcome of every read, and size
    // matches the number of stored entries.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (clock, mut store) = test_store(TEST_MAX_ENTRIES);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => store.set(key, value, None),
                CacheOp::Get { key } => match store.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    store.delete(&key);
                }
                CacheOp::Advance { ms } => clock.advance(ms),
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.total_hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.total_misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.size, store.len(), "Size mismatch");
    }

    // Size never exceeds max_size, whatever mix of writes and time steps.
    #[test]
    fn prop_capacity_enforcement(
        ops in prop::collection::vec(cache_op_strategy(), 1..200),
        max_entries in 1usize..40,
    ) {
        let (clock, mut store) = test_store(max_entries);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => store.set(key, value, None),
                CacheOp::Get { key } => {
                    store.get(&key);
                }
                CacheOp::Delete { key } => {
                    store.delete(&key);
                }
                CacheOp::Advance { ms } => clock.advance(ms),
            }
            prop_assert!(
                store.len() <= max_entries,
                "Cache size {} exceeds max {}",
                store.len(),
                max_entries
            );
        }
    }

    // A second delete of the same key removes nothing and the key stays absent.
    #[test]
    fn prop_delete_is_idempotent(key in valid_key_strategy(), value in valid_value_strategy()) {
        let (_, mut store) = test_store(TEST_MAX_ENTRIES);
        store.set(key.clone(), value, None);

        prop_assert!(store.delete(&key));
        prop_assert!(!store.delete(&key));
        prop_assert!(store.get(&key).is_none());
        prop_assert_eq!(store.len(), 0);
    }

    // An entry is readable through its last TTL millisecond and gone after.
    #[test]
    fn prop_ttl_expiration_behavior(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        ttl_ms in 1u64..600_000,
    ) {
        let (clock, mut store) = test_store(TEST_MAX_ENTRIES);
        store.set(key.clone(), value.clone(), Some(ttl_ms));

        clock.advance(ttl_ms);
        prop_assert_eq!(store.get(&key), Some(value));

        clock.advance(1);
        prop_assert!(store.get(&key).is_none(), "Entry should expire past its TTL");
    }

    // Filling to capacity and inserting one more key evicts the least
    // recently read key, not the first written one.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::hash_set(valid_key_strategy(), 3..8),
        new_key in valid_key_strategy(),
    ) {
        let unique_keys: Vec<String> = keys.into_iter().collect();
        prop_assume!(!unique_keys.contains(&new_key));

        let capacity = unique_keys.len();
        let (_, mut store) = test_store(capacity);
        for key in &unique_keys {
            store.set(key.clone(), format!("value_{key}"), None);
        }

        let accessed_key = unique_keys[0].clone();
        prop_assert!(store.get(&accessed_key).is_some());

        store.set(new_key.clone(), "new".to_string(), None);

        prop_assert_eq!(store.len(), capacity);
        prop_assert!(store.contains(&accessed_key), "Read key should survive eviction");
        prop_assert!(!store.contains(&unique_keys[1]), "Oldest unread key should be evicted");
        prop_assert!(store.contains(&new_key));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // After invalidating `user:admin:list:*` no matching key is readable and
    // every other key is untouched.
    #[test]
    fn prop_pattern_invalidation_is_exact(
        list_ids in prop::collection::hash_set("[a-z0-9]{1,8}", 0..12),
        other_ids in prop::collection::hash_set("[a-z0-9]{1,8}", 0..12),
    ) {
        let (_, clock) = ManualClock::shared(START_MS);
        let config = Config::default();
        let caches = Arc::new(CacheRegistry::with_clock(&config, clock.clone()));
        let monitor = Arc::new(HealthMonitor::with_clock(config.health.clone(), clock));
        let service = InvalidationService::new(caches.clone(), monitor);

        let list_keys: HashSet<String> =
            list_ids.iter().map(|id| format!("user:admin:list:{id}")).collect();
        let other_keys: HashSet<String> =
            other_ids.iter().map(|id| format!("user:detail:{id}")).collect();

        let users = caches.get(CacheDomain::User);
        let results = tokio_test::block_on(async {
            for key in list_keys.iter().chain(other_keys.iter()) {
                users.set(key.clone(), json!(1), None).await;
            }
            service.invalidate_by_pattern("user:admin:list:*", None, None).await
        });

        let removed: HashSet<String> = results
            .iter()
            .filter(|result| result.success)
            .map(|result| result.key.clone())
            .collect();
        prop_assert_eq!(&removed, &list_keys);

        let remaining: HashSet<String> =
            tokio_test::block_on(users.keys()).into_iter().collect();
        prop_assert_eq!(remaining, other_keys);
    }

    // A hotter or more often invalidated key never scores higher.
    #[test]
    fn prop_key_score_is_monotonic(
        count in 1u64..200,
        extra_count in 0u64..200,
        frequency in 0.0f64..30.0,
        extra_frequency in 0.0f64..30.0,
    ) {
        let config = HealthMonitorConfig::default();
        let base = key_score(&stats_with(count, frequency, &config), &config);
        let hotter = key_score(&stats_with(count, frequency + extra_frequency, &config), &config);
        let busier = key_score(&stats_with(count + extra_count, frequency, &config), &config);

        prop_assert!(hotter <= base);
        prop_assert!(busier <= base);
        prop_assert!(base <= 100);
    }

    // Only the most recent `max_reasons` reasons are kept, oldest first.
    #[test]
    fn prop_reasons_are_bounded(total in 1usize..60, step_ms in 1u64..120_000) {
        let (clock, shared) = ManualClock::shared(START_MS);
        let config = HealthMonitorConfig::default();
        let max_reasons = config.max_reasons;
        let monitor = HealthMonitor::with_clock(config, shared);

        for i in 0..total {
            monitor.record_invalidation("user:1", &format!("reason-{i}"));
            clock.advance(step_ms);
        }

        let stats = monitor.key_stats("user:1").unwrap();
        prop_assert_eq!(stats.count, total as u64);
        prop_assert_eq!(stats.reasons.len(), total.min(max_reasons));
        let last_reason = format!("reason-{}", total - 1);
        prop_assert_eq!(stats.reasons.back(), Some(&last_reason));
    }
}
