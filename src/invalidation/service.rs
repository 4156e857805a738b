//! Pattern-based invalidation service.
//!
//! Deletes literal keys or wildcard matches from one or more cache
//! instances, reporting one [`InvalidationResult`] per (key, instance) pair
//! and notifying the [`HealthMonitor`] of every entry actually removed.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::result::summarize;
use super::rules::{default_rules, resolve_targets};
use super::{InvalidationResult, InvalidationRule, InvalidationTarget, KeyPattern};
use crate::cache::{CacheDomain, CacheRegistry};
use crate::health::HealthMonitor;

/// Reason recorded when the caller gives none.
pub const DEFAULT_REASON: &str = "unknown";

/// How long a deletion waits for an instance before reporting failure.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

// == Invalidation Service ==
#[derive(Debug)]
pub struct InvalidationService {
    caches: Arc<CacheRegistry>,
    monitor: Arc<HealthMonitor>,
    rules: RwLock<Vec<InvalidationRule>>,
    lock_timeout: Duration,
}

impl InvalidationService {
    /// Creates a service routing patterns with [`default_rules`].
    pub fn new(caches: Arc<CacheRegistry>, monitor: Arc<HealthMonitor>) -> Self {
        Self::with_rules(caches, monitor, default_rules())
    }

    pub fn with_rules(
        caches: Arc<CacheRegistry>,
        monitor: Arc<HealthMonitor>,
        rules: Vec<InvalidationRule>,
    ) -> Self {
        Self {
            caches,
            monitor,
            rules: RwLock::new(rules),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Overrides how long a deletion may wait on a busy instance.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn caches(&self) -> &Arc<CacheRegistry> {
        &self.caches
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    // == By Key ==
    /// Deletes `key` from each of `instances`.
    pub async fn invalidate_by_key(
        &self,
        key: &str,
        instances: &[CacheDomain],
        reason: Option<&str>,
    ) -> Vec<InvalidationResult> {
        if key.is_empty() {
            warn!("Invalidation skipped: empty key");
            return Vec::new();
        }

        let reason = reason.unwrap_or(DEFAULT_REASON);
        join_all(
            instances
                .iter()
                .map(|domain| self.delete_key(*domain, key, reason)),
        )
        .await
    }

    // == By Pattern ==
    /// Deletes every live key matching `pattern`.
    ///
    /// With `instances` omitted, the instances come from the enabled rules
    /// overlapping the pattern. A malformed pattern or one no rule routes is
    /// logged and yields no results.
    pub async fn invalidate_by_pattern(
        &self,
        pattern: &str,
        instances: Option<&[CacheDomain]>,
        reason: Option<&str>,
    ) -> Vec<InvalidationResult> {
        let parsed = match KeyPattern::parse(pattern) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(pattern, error = %err, "Invalidation skipped: malformed pattern");
                return Vec::new();
            }
        };

        let domains = match instances {
            Some(domains) => domains.to_vec(),
            None => resolve_targets(&self.rules.read().await, &parsed),
        };
        if domains.is_empty() {
            warn!(pattern, "Invalidation skipped: no instance registered for pattern");
            return Vec::new();
        }

        let reason = reason.unwrap_or(DEFAULT_REASON);
        let results: Vec<InvalidationResult> = join_all(
            domains
                .iter()
                .map(|domain| self.delete_matching(*domain, &parsed, reason)),
        )
        .await
        .into_iter()
        .flatten()
        .collect();

        let (succeeded, failed) = summarize(&results);
        info!(pattern, reason, succeeded, failed, "Pattern invalidation finished");
        results
    }

    // == Targets ==
    /// Runs one planned target.
    pub async fn invalidate_target(
        &self,
        target: &InvalidationTarget,
        reason: Option<&str>,
    ) -> Vec<InvalidationResult> {
        match target {
            InvalidationTarget::Key { key, domain } => {
                self.invalidate_by_key(key, &[*domain], reason).await
            }
            InvalidationTarget::Pattern { pattern, domain } => {
                self.invalidate_by_pattern(pattern, Some(&[*domain]), reason)
                    .await
            }
        }
    }

    /// Runs `targets` concurrently; results keep the order of `targets`.
    pub async fn invalidate_targets(
        &self,
        targets: &[InvalidationTarget],
        reason: Option<&str>,
    ) -> Vec<InvalidationResult> {
        join_all(targets.iter().map(|target| self.invalidate_target(target, reason)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    // == Rules ==
    pub async fn rules(&self) -> Vec<InvalidationRule> {
        self.rules.read().await.clone()
    }

    pub async fn add_rule(&self, rule: InvalidationRule) {
        info!(pattern = %rule.pattern, targets = ?rule.target_instances, "Invalidation rule added");
        self.rules.write().await.push(rule);
    }

    /// Enables or disables every rule with `pattern`; returns whether any matched.
    pub async fn set_rule_enabled(&self, pattern: &str, enabled: bool) -> bool {
        let mut rules = self.rules.write().await;
        let mut found = false;
        for rule in rules.iter_mut().filter(|rule| rule.pattern == pattern) {
            rule.enabled = enabled;
            found = true;
        }
        found
    }

    async fn delete_key(&self, domain: CacheDomain, key: &str, reason: &str) -> InvalidationResult {
        let instance = self.caches.get(domain);
        match instance.try_delete(key, self.lock_timeout).await {
            Ok(removed) => {
                if removed {
                    self.monitor.record_invalidation(key, reason);
                }
                debug!(%domain, key, removed, "Cache key invalidated");
                InvalidationResult::ok(key, domain)
            }
            Err(err) => {
                warn!(%domain, key, error = %err, "Cache key invalidation failed");
                InvalidationResult::failed(key, domain, err.to_string())
            }
        }
    }

    async fn delete_matching(
        &self,
        domain: CacheDomain,
        pattern: &KeyPattern,
        reason: &str,
    ) -> Vec<InvalidationResult> {
        if pattern.is_exact() {
            return vec![self.delete_key(domain, pattern.literal(), reason).await];
        }

        let instance = self.caches.get(domain);
        let keys = match instance.try_keys(self.lock_timeout).await {
            Ok(keys) => keys,
            Err(err) => {
                warn!(%domain, %pattern, error = %err, "Could not list keys for invalidation");
                return vec![InvalidationResult::failed(
                    pattern.to_string(),
                    domain,
                    err.to_string(),
                )];
            }
        };

        let mut results = Vec::new();
        for key in keys.iter().filter(|key| pattern.matches(key)) {
            results.push(self.delete_key(domain, key, reason).await);
        }
        results
    }
}
