//! Response DTOs for the cache admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheDomain, InstanceStats};
use crate::invalidation::{summarize, InvalidationResult};

/// Response body for the stats endpoint (GET /cache/stats)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Entries across all instances
    pub total_size: usize,
    pub total_hits: u64,
    pub total_misses: u64,
    /// Hit rate across all instances (hits / (hits + misses))
    pub hit_rate: f64,
    pub instances: Vec<InstanceStats>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from per-instance statistics
    pub fn new(instances: Vec<InstanceStats>) -> Self {
        let total_size = instances.iter().map(|i| i.stats.size).sum();
        let total_hits: u64 = instances.iter().map(|i| i.stats.total_hits).sum();
        let total_misses: u64 = instances.iter().map(|i| i.stats.total_misses).sum();
        let total_requests = total_hits + total_misses;
        let hit_rate = if total_requests > 0 {
            total_hits as f64 / total_requests as f64
        } else {
            0.0
        };
        Self {
            total_size,
            total_hits,
            total_misses,
            hit_rate,
            instances,
        }
    }
}

/// Response body for the key listing (GET /cache/{domain}/keys)
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub domain: CacheDomain,
    pub count: usize,
    pub keys: Vec<String>,
}

impl KeysResponse {
    /// Creates a new KeysResponse; keys are sorted for stable output
    pub fn new(domain: CacheDomain, mut keys: Vec<String>) -> Self {
        keys.sort();
        Self {
            domain,
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for cache clears (DELETE /cache, DELETE /cache/{domain})
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    pub instances: Vec<CacheDomain>,
}

impl ClearResponse {
    /// Creates a new ClearResponse
    pub fn new(instances: Vec<CacheDomain>) -> Self {
        let names: Vec<&str> = instances.iter().map(CacheDomain::as_str).collect();
        Self {
            message: format!("Cleared {}", names.join(", ")),
            instances,
        }
    }
}

/// Response body for invalidation endpoints
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationResponse {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<InvalidationResult>,
}

impl InvalidationResponse {
    /// Creates a new InvalidationResponse, counting the outcomes
    pub fn new(results: Vec<InvalidationResult>) -> Self {
        let (succeeded, failed) = summarize(&results);
        Self {
            succeeded,
            failed,
            results,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body of operations that only report success
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
