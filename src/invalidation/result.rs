//! Invalidation targets and outcomes.

use serde::Serialize;

use crate::cache::CacheDomain;

// == Invalidation Target ==
/// One key or pattern to invalidate in one instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvalidationTarget {
    Key { key: String, domain: CacheDomain },
    Pattern { pattern: String, domain: CacheDomain },
}

impl InvalidationTarget {
    pub fn key(key: impl Into<String>, domain: CacheDomain) -> Self {
        InvalidationTarget::Key {
            key: key.into(),
            domain,
        }
    }

    pub fn pattern(pattern: impl Into<String>, domain: CacheDomain) -> Self {
        InvalidationTarget::Pattern {
            pattern: pattern.into(),
            domain,
        }
    }

    pub fn domain(&self) -> CacheDomain {
        match self {
            InvalidationTarget::Key { domain, .. } | InvalidationTarget::Pattern { domain, .. } => {
                *domain
            }
        }
    }

    /// The key or pattern text.
    pub fn text(&self) -> &str {
        match self {
            InvalidationTarget::Key { key, .. } => key,
            InvalidationTarget::Pattern { pattern, .. } => pattern,
        }
    }
}

// == Invalidation Result ==
/// Outcome of one (key, instance) deletion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationResult {
    pub key: String,
    pub instance: CacheDomain,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvalidationResult {
    pub fn ok(key: impl Into<String>, instance: CacheDomain) -> Self {
        Self {
            key: key.into(),
            instance,
            success: true,
            error: None,
        }
    }

    pub fn failed(key: impl Into<String>, instance: CacheDomain, error: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            instance,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Counts of a batch of results, for logging.
pub fn summarize(results: &[InvalidationResult]) -> (usize, usize) {
    let failed = results.iter().filter(|r| !r.success).count();
    (results.len() - failed, failed)
}
