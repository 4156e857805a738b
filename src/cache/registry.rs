//! Cache Registry Module
//!
//! Owns the single instance of every cache domain for the process lifetime.

use std::sync::Arc;

use futures::future::join_all;
use tracing::info;

use crate::cache::{CacheDomain, CacheInstance, InstanceStats};
use crate::clock::{system_clock, SharedClock};
use crate::config::Config;
use crate::error::Result;

// == Cache Registry ==
/// One [`CacheInstance`] per [`CacheDomain`], indexed by domain.
#[derive(Debug)]
pub struct CacheRegistry {
    instances: Vec<Arc<CacheInstance>>,
}

impl CacheRegistry {
    /// Builds every domain's instance from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::with_clock(config, system_clock())
    }

    /// Builds every domain's instance reading time from `clock`.
    pub fn with_clock(config: &Config, clock: SharedClock) -> Self {
        let instances = CacheDomain::ALL
            .into_iter()
            .map(|domain| {
                Arc::new(CacheInstance::with_clock(
                    domain,
                    config.cache(domain),
                    clock.clone(),
                ))
            })
            .collect();

        Self { instances }
    }

    /// Returns the instance of `domain`.
    pub fn get(&self, domain: CacheDomain) -> Arc<CacheInstance> {
        self.instances[domain.index()].clone()
    }

    /// Looks an instance up by name.
    ///
    /// An unknown name is a wiring bug on the caller's side and is returned
    /// as [`CacheError::UnknownDomain`](crate::error::CacheError::UnknownDomain).
    pub fn by_name(&self, name: &str) -> Result<Arc<CacheInstance>> {
        let domain: CacheDomain = name.parse()?;
        Ok(self.get(domain))
    }

    /// Every instance, in [`CacheDomain::ALL`] order.
    pub fn all(&self) -> impl Iterator<Item = &Arc<CacheInstance>> {
        self.instances.iter()
    }

    /// Statistics of every instance.
    pub async fn stats_all(&self) -> Vec<InstanceStats> {
        join_all(self.instances.iter().map(|instance| instance.stats())).await
    }

    /// Clears every instance.
    pub async fn clear_all(&self) {
        join_all(self.instances.iter().map(|instance| instance.clear())).await;
        info!("All cache instances cleared");
    }
}
