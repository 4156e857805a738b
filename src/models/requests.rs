//! Request DTOs for the cache admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheDomain;
use crate::error::{CacheError, Result};
use crate::orchestrator::InvalidateOptions;

/// Longest key or pattern accepted from a client.
const MAX_KEY_LENGTH: usize = 256;

/// Request body for manual invalidation (POST /cache/invalidate)
///
/// Exactly one of `key` or `pattern` must be given. Without `instances`
/// the instances are picked by the invalidation rules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateRequest {
    /// A literal key
    #[serde(default)]
    pub key: Option<String>,
    /// A wildcard pattern such as `user:admin:list:*`
    #[serde(default)]
    pub pattern: Option<String>,
    /// Cache domain names to target
    #[serde(default)]
    pub instances: Option<Vec<String>>,
    /// Recorded with the health monitor
    #[serde(default)]
    pub reason: Option<String>,
}

impl InvalidateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match (&self.key, &self.pattern) {
            (Some(_), Some(_)) => Some("Give either key or pattern, not both".to_string()),
            (None, None) => Some("Either key or pattern is required".to_string()),
            (Some(key), None) => {
                if key.is_empty() {
                    Some("Key cannot be empty".to_string())
                } else if key.contains('*') {
                    Some("Key cannot contain '*'; use pattern instead".to_string())
                } else if key.len() > MAX_KEY_LENGTH {
                    Some(format!(
                        "Key exceeds maximum length of {MAX_KEY_LENGTH} characters"
                    ))
                } else {
                    None
                }
            }
            (None, Some(pattern)) => {
                if pattern.len() > MAX_KEY_LENGTH {
                    Some(format!(
                        "Pattern exceeds maximum length of {MAX_KEY_LENGTH} characters"
                    ))
                } else {
                    None
                }
            }
        }
    }

    /// Parses `instances`; an unknown name is an error.
    pub fn domains(&self) -> Result<Option<Vec<CacheDomain>>> {
        self.instances
            .as_ref()
            .map(|names| names.iter().map(|name| name.parse::<CacheDomain>()).collect())
            .transpose()
    }
}

/// Request body for an orchestrated invalidation
/// (POST /cache/invalidate/{orchestrator})
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorRequest {
    /// Event name, e.g. `UPDATE` or `batch_delete`
    pub event: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub invalidate_stats: Option<bool>,
    #[serde(default)]
    pub invalidate_list: Option<bool>,
    /// Delay of the secondary pass in milliseconds
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl OrchestratorRequest {
    /// Converts the body into options for an orchestrator with events `E`.
    pub fn into_options<E>(self) -> Result<InvalidateOptions<E>>
    where
        E: FromStr<Err = CacheError>,
    {
        let mut options = InvalidateOptions::new(self.event.parse::<E>()?);
        options.id = self.id;
        options.ids = self.ids;
        options.categories = self.categories;
        options.invalidate_stats = self.invalidate_stats.unwrap_or(true);
        options.invalidate_list = self.invalidate_list.unwrap_or(true);
        options.delay = self.delay_ms.map(Duration::from_millis);
        options.reason = self.reason;
        Ok(options)
    }
}
