//! Application Context
//!
//! Every shared component of the cache layer, built once at startup and
//! handed to the HTTP layer and background tasks. Tests build their own
//! isolated context, usually over a [`ManualClock`](crate::clock::ManualClock).

use std::sync::Arc;

use tracing::info;

use crate::cache::CacheRegistry;
use crate::clock::{system_clock, SharedClock};
use crate::config::Config;
use crate::health::HealthMonitor;
use crate::invalidation::InvalidationService;
use crate::orchestrator::{
    ActivityInvalidator, ActivityPlanner, DelayedInvalidations, Orchestrator, ProfileInvalidator,
    ProfilePlanner, SettingsInvalidator, SettingsPlanner, UserInvalidator, UserPlanner,
};
use crate::rate_limit::RateLimiter;

#[derive(Debug, Clone)]
pub struct AppContext {
    pub caches: Arc<CacheRegistry>,
    pub monitor: Arc<HealthMonitor>,
    pub invalidation: Arc<InvalidationService>,
    pub users: Arc<UserInvalidator>,
    pub settings: Arc<SettingsInvalidator>,
    pub profiles: Arc<ProfileInvalidator>,
    pub activities: Arc<ActivityInvalidator>,
    pub delayed: Arc<DelayedInvalidations>,
    pub admin_limiter: Arc<RateLimiter>,
    pub sensitive_limiter: Arc<RateLimiter>,
}

impl AppContext {
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, system_clock())
    }

    /// Builds every component reading time from `clock`.
    pub fn with_clock(config: &Config, clock: SharedClock) -> Self {
        let caches = Arc::new(CacheRegistry::with_clock(config, clock.clone()));
        let monitor = Arc::new(HealthMonitor::with_clock(config.health.clone(), clock.clone()));
        let invalidation = Arc::new(InvalidationService::new(caches.clone(), monitor.clone()));
        let delayed = Arc::new(DelayedInvalidations::new());

        Self {
            users: Arc::new(Orchestrator::new(UserPlanner, invalidation.clone(), delayed.clone())),
            settings: Arc::new(Orchestrator::new(
                SettingsPlanner,
                invalidation.clone(),
                delayed.clone(),
            )),
            profiles: Arc::new(Orchestrator::new(
                ProfilePlanner,
                invalidation.clone(),
                delayed.clone(),
            )),
            activities: Arc::new(Orchestrator::new(
                ActivityPlanner,
                invalidation.clone(),
                delayed.clone(),
            )),
            admin_limiter: Arc::new(RateLimiter::with_clock(
                config.admin_rate_limit.clone(),
                clock.clone(),
            )),
            sensitive_limiter: Arc::new(RateLimiter::with_clock(
                config.sensitive_rate_limit.clone(),
                clock,
            )),
            caches,
            monitor,
            invalidation,
            delayed,
        }
    }

    /// Cancels pending delayed invalidations and empties every instance.
    pub async fn shutdown(&self) {
        let cancelled = self.delayed.cancel_all();
        self.caches.clear_all().await;
        info!(cancelled, "Cache layer shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDomain;
    use crate::orchestrator::{InvalidateOptions, UserEvent};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_components_share_state() {
        let ctx = AppContext::new(&Config::default());
        let users = ctx.caches.get(CacheDomain::User);
        users.set("user:detail:1", json!({"name": "a"}), None).await;

        ctx.users
            .invalidate(InvalidateOptions::new(UserEvent::Update).with_id("1"))
            .await;

        assert!(!users.contains("user:detail:1").await);
        assert_eq!(ctx.monitor.tracked_keys(), 1);
    }

    #[tokio::test]
    async fn test_contexts_are_isolated() {
        let first = AppContext::new(&Config::default());
        let second = AppContext::new(&Config::default());

        first
            .caches
            .get(CacheDomain::Api)
            .set("api:x", json!(1), None)
            .await;

        assert!(second.caches.get(CacheDomain::Api).is_empty().await);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_and_clears() {
        let ctx = AppContext::new(&Config::default());
        ctx.caches
            .get(CacheDomain::Stats)
            .set("stats:users:total", json!(3), None)
            .await;

        ctx.users
            .invalidate(
                InvalidateOptions::new(UserEvent::Create).with_delay(Duration::from_secs(60)),
            )
            .await;
        assert_eq!(ctx.delayed.pending_count(), 1);

        ctx.shutdown().await;

        assert_eq!(ctx.delayed.pending_count(), 0);
        for instance in ctx.caches.all() {
            assert!(instance.is_empty().await);
        }
    }
}
