//! Cache Instance Module
//!
//! A named, shareable cache: one [`CacheStore`] of JSON values behind an
//! async lock, plus the read-through helper used by data-fetching code.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{CacheDomain, CacheStats, CacheStore};
use crate::clock::{system_clock, SharedClock};
use crate::config::CacheInstanceConfig;
use crate::error::{CacheError, Result};

// == Instance Stats ==
/// Statistics of one instance, tagged with its domain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStats {
    pub domain: CacheDomain,
    pub enabled: bool,
    #[serde(flatten)]
    pub stats: CacheStats,
}

// == Cache Instance ==
/// Thread-safe cache instance for one domain.
///
/// Reads and writes never fail: a disabled instance behaves as an
/// always-miss passthrough and a value that cannot be (de)serialized is
/// treated as a miss.
#[derive(Debug)]
pub struct CacheInstance {
    domain: CacheDomain,
    config: CacheInstanceConfig,
    store: RwLock<CacheStore<Value>>,
}

impl CacheInstance {
    /// Creates an instance for `domain` sized by `config`.
    pub fn new(domain: CacheDomain, config: CacheInstanceConfig) -> Self {
        Self::with_clock(domain, config, system_clock())
    }

    /// Creates an instance reading time from `clock`.
    pub fn with_clock(domain: CacheDomain, config: CacheInstanceConfig, clock: SharedClock) -> Self {
        let store = CacheStore::with_clock(config.max_size, config.default_ttl_ms, clock);
        Self {
            domain,
            config,
            store: RwLock::new(store),
        }
    }

    pub fn domain(&self) -> CacheDomain {
        self.domain
    }

    pub fn config(&self) -> &CacheInstanceConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    // == Get ==
    /// Returns the live value stored under `key`.
    ///
    /// A write lock is taken because a read updates recency and counters.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let mut store = self.store.write().await;
        if !self.config.enabled {
            store.record_miss();
            return None;
        }
        store.get(key)
    }

    /// Returns the value under `key` decoded as `T`; undecodable values are misses.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(domain = %self.domain, key, error = %err, "Cached value has unexpected shape");
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`; `ttl` falls back to the instance default.
    pub async fn set(&self, key: impl Into<String>, value: Value, ttl: Option<Duration>) {
        if !self.config.enabled {
            return;
        }
        let ttl_ms = ttl.map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
        self.store.write().await.set(key.into(), value, ttl_ms);
    }

    /// Encodes `value` as JSON and stores it; encoding failures are logged and skipped.
    pub async fn set_as<T: Serialize>(&self, key: impl Into<String>, value: &T, ttl: Option<Duration>) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(encoded) => self.set(key, encoded, ttl).await,
            Err(err) => {
                warn!(domain = %self.domain, key = %key, error = %err, "Value not cacheable");
            }
        }
    }

    // == Get Or Set ==
    /// Read-through helper.
    ///
    /// Returns the cached value for `key` when present. On a miss, awaits
    /// `fetch`, caches its successful result for `ttl` and returns it. Fetch
    /// errors are returned untouched and nothing is cached.
    pub async fn get_or_set<T, F, Fut, E>(&self, key: &str, fetch: F, ttl: Option<Duration>) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(cached) = self.get_as::<T>(key).await {
            debug!(domain = %self.domain, key, "Cache hit");
            return Ok(cached);
        }

        debug!(domain = %self.domain, key, "Cache miss, fetching");
        let fresh = fetch().await?;
        self.set_as(key, &fresh, ttl).await;
        Ok(fresh)
    }

    /// Whether a live entry exists, without touching recency or counters.
    pub async fn contains(&self, key: &str) -> bool {
        self.store.read().await.contains(key)
    }

    // == Delete ==
    /// Removes `key`; returns whether an entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    /// Removes `key`, giving up if the store cannot be locked within `timeout`.
    pub async fn try_delete(&self, key: &str, timeout: Duration) -> Result<bool> {
        let mut store = tokio::time::timeout(timeout, self.store.write())
            .await
            .map_err(|_| self.lock_timeout(timeout))?;
        Ok(store.delete(key))
    }

    // == Clear ==
    /// Removes every entry; counters are kept.
    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    // == Keys ==
    /// Snapshot of live keys.
    pub async fn keys(&self) -> Vec<String> {
        self.store.read().await.keys()
    }

    /// Snapshot of live keys, giving up if the store cannot be read within `timeout`.
    pub async fn try_keys(&self, timeout: Duration) -> Result<Vec<String>> {
        let store = tokio::time::timeout(timeout, self.store.read())
            .await
            .map_err(|_| self.lock_timeout(timeout))?;
        Ok(store.keys())
    }

    // == Stats ==
    pub async fn stats(&self) -> InstanceStats {
        InstanceStats {
            domain: self.domain,
            enabled: self.config.enabled,
            stats: self.store.read().await.stats(),
        }
    }

    /// Drops expired entries; returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.store.write().await.cleanup_expired()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    fn lock_timeout(&self, timeout: Duration) -> CacheError {
        CacheError::Backend(format!(
            "{} cache lock not acquired within {}ms",
            self.domain,
            timeout.as_millis()
        ))
    }

    #[cfg(test)]
    pub(crate) async fn lock_for_test(&self) -> tokio::sync::RwLockWriteGuard<'_, CacheStore<Value>> {
        self.store.write().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn config(max_size: usize, enabled: bool) -> CacheInstanceConfig {
        CacheInstanceConfig {
            max_size,
            default_ttl_ms: 60_000,
            cleanup_interval_ms: 60_000,
            enabled,
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let instance = CacheInstance::new(CacheDomain::User, config(10, true));

        instance.set("user:1", json!({"name": "a"}), None).await;
        assert_eq!(instance.get("user:1").await, Some(json!({"name": "a"})));

        assert!(instance.delete("user:1").await);
        assert!(!instance.delete("user:1").await);
        assert_eq!(instance.get("user:1").await, None);
    }

    #[tokio::test]
    async fn test_ttl_scenario_with_manual_clock() {
        let (clock, shared) = ManualClock::shared(0);
        let instance = CacheInstance::with_clock(CacheDomain::User, config(10, true), shared);

        instance
            .set("user:1", json!({"name": "a"}), Some(Duration::from_millis(1000)))
            .await;
        assert_eq!(instance.get("user:1").await, Some(json!({"name": "a"})));

        clock.advance(1100);
        assert_eq!(instance.get("user:1").await, None);
    }

    #[tokio::test]
    async fn test_oversized_ttl_saturates() {
        let (clock, shared) = ManualClock::shared(0);
        let instance = CacheInstance::with_clock(CacheDomain::User, config(10, true), shared);

        // 18_446_744_073_709_552_000 ms wraps to 384 ms when truncated to u64
        let ttl = Duration::from_secs(18_446_744_073_709_552);
        instance.set("user:1", json!(1), Some(ttl)).await;

        clock.advance(1_000);
        assert_eq!(instance.get("user:1").await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_disabled_instance_is_passthrough() {
        let instance = CacheInstance::new(CacheDomain::Api, config(10, false));

        instance.set("api:x", json!(1), None).await;
        assert_eq!(instance.get("api:x").await, None);
        assert!(instance.is_empty().await);

        let stats = instance.stats().await;
        assert!(!stats.enabled);
        assert_eq!(stats.stats.total_misses, 1);
    }

    #[tokio::test]
    async fn test_get_or_set_fetches_once() {
        let instance = CacheInstance::new(CacheDomain::User, config(10, true));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let profile: std::result::Result<Profile, String> = instance
                .get_or_set(
                    "user:profile:1",
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(Profile { name: "ada".into() })
                    },
                    None,
                )
                .await;
            assert_eq!(profile.unwrap().name, "ada");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_set_does_not_cache_errors() {
        let instance = CacheInstance::new(CacheDomain::User, config(10, true));

        let result: std::result::Result<Profile, &str> = instance
            .get_or_set("user:profile:2", || async { Err("db down") }, None)
            .await;

        assert_eq!(result.unwrap_err(), "db down");
        assert!(instance.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_or_set_on_disabled_instance_always_fetches() {
        let instance = CacheInstance::new(CacheDomain::User, config(10, false));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let _: std::result::Result<u32, ()> = instance
                .get_or_set(
                    "user:n",
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(7)
                    },
                    None,
                )
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_get_as_with_wrong_shape_is_a_miss() {
        let instance = CacheInstance::new(CacheDomain::User, config(10, true));
        instance.set("user:1", json!("not a profile"), None).await;

        assert_eq!(instance.get_as::<Profile>("user:1").await, None);
    }

    #[tokio::test]
    async fn test_try_delete_times_out_while_locked() {
        let instance = Arc::new(CacheInstance::new(CacheDomain::Stats, config(10, true)));
        instance.set("stats:a", json!(1), None).await;

        let guard = instance.lock_for_test().await;
        let result = instance
            .try_delete("stats:a", Duration::from_millis(20))
            .await;
        drop(guard);

        assert!(matches!(result, Err(CacheError::Backend(_))));
        assert_eq!(
            instance.try_delete("stats:a", Duration::from_millis(20)).await,
            Ok(true)
        );
    }

    #[tokio::test]
    async fn test_stats_are_tagged_with_domain() {
        let instance = CacheInstance::new(CacheDomain::Content, config(5, true));
        instance.set("content:a", json!({"v": 1}), None).await;

        let stats = instance.stats().await;
        assert_eq!(stats.domain, CacheDomain::Content);
        assert_eq!(stats.stats.size, 1);
        assert_eq!(stats.stats.max_size, 5);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["domain"], "content");
        assert_eq!(json["size"], 1);
    }
}
