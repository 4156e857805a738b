//! Configuration Module
//!
//! Handles loading and managing cache layer configuration from environment
//! variables, with optional per-domain overrides from a persisted JSON file.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

use crate::cache::CacheDomain;
use crate::error::CacheError;
use crate::rate_limit::RateLimitConfig;

const MINUTE_MS: u64 = 60 * 1000;
const HOUR_MS: u64 = 60 * MINUTE_MS;

// == Cache Instance Config ==
/// Sizing and lifecycle options of one cache instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInstanceConfig {
    /// Entry count ceiling
    pub max_size: usize,
    /// TTL applied when `set` gets no explicit TTL (ms)
    pub default_ttl_ms: u64,
    /// Background sweep period (ms)
    pub cleanup_interval_ms: u64,
    /// When false the instance always misses and ignores writes
    pub enabled: bool,
}

impl CacheInstanceConfig {
    /// Applies the fields present in `overrides`.
    pub fn apply(&mut self, overrides: &CacheInstanceOverride) {
        if let Some(max_size) = overrides.max_size {
            self.max_size = max_size;
        }
        if let Some(default_ttl) = overrides.default_ttl {
            self.default_ttl_ms = default_ttl;
        }
        if let Some(cleanup_interval) = overrides.cleanup_interval {
            self.cleanup_interval_ms = cleanup_interval;
        }
        if let Some(enabled) = overrides.enabled {
            self.enabled = enabled;
        }
    }
}

/// Persisted override for one cache instance. Missing fields keep the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInstanceOverride {
    pub max_size: Option<usize>,
    #[serde(rename = "defaultTTL")]
    pub default_ttl: Option<u64>,
    pub cleanup_interval: Option<u64>,
    pub enabled: Option<bool>,
}

// == Health Monitor Config ==
/// Tuning of the invalidation health monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthMonitorConfig {
    /// Frequency (invalidations/minute) above which a key is medium impact
    pub medium_threshold: f64,
    /// Frequency (invalidations/minute) above which a key is high impact
    pub high_threshold: f64,
    /// Weight of the newest sample in the exponential smoothing
    pub smoothing_weight: f64,
    /// Number of reasons kept per key
    pub max_reasons: usize,
    /// Records idle longer than this are dropped by the sweep (ms)
    pub retention_ms: u64,
    /// Window used by the real-time status (ms)
    pub realtime_window_ms: u64,
    /// Idle time after which the reported frequency has halved (ms)
    pub decay_half_life_ms: u64,
    /// Sweep period (ms)
    pub cleanup_interval_ms: u64,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            medium_threshold: 5.0,
            high_threshold: 10.0,
            smoothing_weight: 0.7,
            max_reasons: 20,
            retention_ms: 24 * HOUR_MS,
            realtime_window_ms: 5 * MINUTE_MS,
            decay_half_life_ms: 5 * MINUTE_MS,
            cleanup_interval_ms: MINUTE_MS,
        }
    }
}

// == Config ==
/// Cache layer configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port of the admin surface
    pub server_port: u16,
    /// Per-domain cache instance options
    pub caches: HashMap<CacheDomain, CacheInstanceConfig>,
    /// Health monitor tuning
    pub health: HealthMonitorConfig,
    /// Limiter guarding the admin endpoints
    pub admin_rate_limit: RateLimitConfig,
    /// Limiter guarding sensitive operations (cache clears, health reset)
    pub sensitive_rate_limit: RateLimitConfig,
    /// Sweep period of the rate limiter window records (ms)
    pub rate_limit_cleanup_interval_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_<DOMAIN>_MAX_SIZE`, `CACHE_<DOMAIN>_DEFAULT_TTL_MS`,
    ///   `CACHE_<DOMAIN>_CLEANUP_INTERVAL_MS`, `CACHE_<DOMAIN>_ENABLED`
    /// - `HEALTH_MEDIUM_THRESHOLD` / `HEALTH_HIGH_THRESHOLD` - invalidations per minute (5 / 10)
    /// - `HEALTH_RETENTION_MS` - stats retention (24h)
    /// - `HEALTH_CLEANUP_INTERVAL_MS` - monitor sweep period (1 min)
    /// - `ADMIN_RATE_LIMIT_MAX` / `ADMIN_RATE_LIMIT_WINDOW_MS` (100 per 15 min)
    /// - `SENSITIVE_RATE_LIMIT_MAX` / `SENSITIVE_RATE_LIMIT_WINDOW_MS` (10 per 15 min)
    /// - `RATE_LIMIT_CLEANUP_INTERVAL_MS` - limiter sweep period (1 min)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let caches = CacheDomain::ALL
            .into_iter()
            .map(|domain| {
                let base = domain.default_config();
                let prefix = format!("CACHE_{}", domain.as_str().to_ascii_uppercase());
                let config = CacheInstanceConfig {
                    max_size: env_or(&format!("{prefix}_MAX_SIZE"), base.max_size),
                    default_ttl_ms: env_or(&format!("{prefix}_DEFAULT_TTL_MS"), base.default_ttl_ms),
                    cleanup_interval_ms: env_or(
                        &format!("{prefix}_CLEANUP_INTERVAL_MS"),
                        base.cleanup_interval_ms,
                    ),
                    enabled: env_or(&format!("{prefix}_ENABLED"), base.enabled),
                };
                (domain, config)
            })
            .collect();

        let health = HealthMonitorConfig {
            medium_threshold: env_or("HEALTH_MEDIUM_THRESHOLD", defaults.health.medium_threshold),
            high_threshold: env_or("HEALTH_HIGH_THRESHOLD", defaults.health.high_threshold),
            retention_ms: env_or("HEALTH_RETENTION_MS", defaults.health.retention_ms),
            cleanup_interval_ms: env_or(
                "HEALTH_CLEANUP_INTERVAL_MS",
                defaults.health.cleanup_interval_ms,
            ),
            ..defaults.health
        };

        let admin_rate_limit = RateLimitConfig {
            max_requests: env_or("ADMIN_RATE_LIMIT_MAX", defaults.admin_rate_limit.max_requests),
            window_ms: env_or("ADMIN_RATE_LIMIT_WINDOW_MS", defaults.admin_rate_limit.window_ms),
            ..defaults.admin_rate_limit
        };

        let sensitive_rate_limit = RateLimitConfig {
            max_requests: env_or(
                "SENSITIVE_RATE_LIMIT_MAX",
                defaults.sensitive_rate_limit.max_requests,
            ),
            window_ms: env_or(
                "SENSITIVE_RATE_LIMIT_WINDOW_MS",
                defaults.sensitive_rate_limit.window_ms,
            ),
            ..defaults.sensitive_rate_limit
        };

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            caches,
            health,
            admin_rate_limit,
            sensitive_rate_limit,
            rate_limit_cleanup_interval_ms: env_or(
                "RATE_LIMIT_CLEANUP_INTERVAL_MS",
                defaults.rate_limit_cleanup_interval_ms,
            ),
        }
    }

    /// Loads the environment configuration, then merges the JSON file named
    /// by `CACHE_CONFIG_FILE` when that variable is set.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::from_env();

        if let Ok(path) = env::var("CACHE_CONFIG_FILE") {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading cache config file {path}"))?;
            config
                .apply_overrides_json(&raw)
                .with_context(|| format!("applying cache config file {path}"))?;
        }

        Ok(config)
    }

    /// Merges persisted per-domain overrides, e.g.
    /// `{"user": {"maxSize": 50, "defaultTTL": 1000}}`.
    pub fn apply_overrides_json(&mut self, raw: &str) -> Result<(), CacheError> {
        let overrides: HashMap<String, CacheInstanceOverride> = serde_json::from_str(raw)
            .map_err(|err| CacheError::InvalidRequest(format!("cache config: {err}")))?;

        for (name, instance_override) in overrides {
            let domain: CacheDomain = name.parse()?;
            self.caches
                .entry(domain)
                .or_insert_with(|| domain.default_config())
                .apply(&instance_override);
        }

        Ok(())
    }

    /// Returns the options of one cache domain.
    pub fn cache(&self, domain: CacheDomain) -> CacheInstanceConfig {
        self.caches
            .get(&domain)
            .cloned()
            .unwrap_or_else(|| domain.default_config())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            caches: CacheDomain::ALL
                .into_iter()
                .map(|domain| (domain, domain.default_config()))
                .collect(),
            health: HealthMonitorConfig::default(),
            admin_rate_limit: RateLimitConfig::admin(),
            sensitive_rate_limit: RateLimitConfig::sensitive(),
            rate_limit_cleanup_interval_ms: MINUTE_MS,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.caches.len(), CacheDomain::ALL.len());
        assert_eq!(config.health.high_threshold, 10.0);
        assert_eq!(config.health.medium_threshold, 5.0);
        assert_eq!(config.health.max_reasons, 20);
        assert_eq!(config.health.retention_ms, 24 * HOUR_MS);
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("SERVER_PORT");
        env::remove_var("CACHE_USER_MAX_SIZE");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cache(CacheDomain::User), CacheDomain::User.default_config());
    }

    #[test]
    fn test_config_from_env_reads_domain_variables() {
        env::set_var("CACHE_STATS_MAX_SIZE", "7");
        env::set_var("CACHE_STATS_ENABLED", "false");

        let config = Config::from_env();
        let stats = config.cache(CacheDomain::Stats);
        assert_eq!(stats.max_size, 7);
        assert!(!stats.enabled);

        env::remove_var("CACHE_STATS_MAX_SIZE");
        env::remove_var("CACHE_STATS_ENABLED");
    }

    #[test]
    fn test_apply_overrides_json_merges_fields() {
        let mut config = Config::default();
        config
            .apply_overrides_json(r#"{"user": {"maxSize": 50, "defaultTTL": 1000}, "api": {"enabled": false}}"#)
            .unwrap();

        let user = config.cache(CacheDomain::User);
        assert_eq!(user.max_size, 50);
        assert_eq!(user.default_ttl_ms, 1000);
        assert_eq!(
            user.cleanup_interval_ms,
            CacheDomain::User.default_config().cleanup_interval_ms
        );
        assert!(!config.cache(CacheDomain::Api).enabled);
    }

    #[test]
    fn test_apply_overrides_json_rejects_unknown_domain() {
        let mut config = Config::default();
        let err = config
            .apply_overrides_json(r#"{"posts": {"maxSize": 5}}"#)
            .unwrap_err();
        assert_eq!(err, CacheError::UnknownDomain("posts".to_string()));
    }

    #[test]
    fn test_apply_overrides_json_rejects_malformed_json() {
        let mut config = Config::default();
        let err = config.apply_overrides_json("{not json").unwrap_err();
        assert!(matches!(err, CacheError::InvalidRequest(_)));
    }
}
