//! Cache Domain Module
//!
//! Names the cache instances the application runs with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::CacheInstanceConfig;
use crate::error::CacheError;

const MINUTE_MS: u64 = 60 * 1000;

// == Cache Domain ==
/// One named cache instance. Each domain owns the keys starting with its
/// name followed by `:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheDomain {
    User,
    Content,
    Stats,
    Config,
    Session,
    Api,
}

impl CacheDomain {
    /// Every domain, in registry order.
    pub const ALL: [CacheDomain; 6] = [
        CacheDomain::User,
        CacheDomain::Content,
        CacheDomain::Stats,
        CacheDomain::Config,
        CacheDomain::Session,
        CacheDomain::Api,
    ];

    /// Returns the domain name, which is also its key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheDomain::User => "user",
            CacheDomain::Content => "content",
            CacheDomain::Stats => "stats",
            CacheDomain::Config => "config",
            CacheDomain::Session => "session",
            CacheDomain::Api => "api",
        }
    }

    /// Position of the domain inside [`CacheDomain::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Built-in sizing for the domain.
    ///
    /// Session and API responses churn quickly and are swept every minute;
    /// configuration rarely changes and lives longest.
    pub fn default_config(&self) -> CacheInstanceConfig {
        let (max_size, ttl_minutes, cleanup_minutes) = match self {
            CacheDomain::User => (1000, 5, 5),
            CacheDomain::Content => (2000, 10, 5),
            CacheDomain::Stats => (500, 15, 10),
            CacheDomain::Config => (200, 30, 15),
            CacheDomain::Session => (5000, 30, 1),
            CacheDomain::Api => (1000, 2, 1),
        };

        CacheInstanceConfig {
            max_size,
            default_ttl_ms: ttl_minutes * MINUTE_MS,
            cleanup_interval_ms: cleanup_minutes * MINUTE_MS,
            enabled: true,
        }
    }
}

impl fmt::Display for CacheDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheDomain {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CacheDomain::ALL
            .into_iter()
            .find(|domain| domain.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CacheError::UnknownDomain(s.to_string()))
    }
}
