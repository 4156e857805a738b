//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.
//!
//! Only wiring mistakes (unknown cache domain, malformed admin input) and
//! rate-limit denials surface as errors. Cache reads and invalidations
//! degrade to misses or failed [`InvalidationResult`](crate::invalidation::InvalidationResult)s instead.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// A cache domain name that no instance is registered under
    #[error("Unknown cache domain: {0}")]
    UnknownDomain(String),

    /// Key or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalidation pattern that is empty or has a wildcard in the middle
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Client exceeded its request window
    #[error("Too many requests, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Backing store could not be accessed
    #[error("Cache backend unavailable: {0}")]
    Backend(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::UnknownDomain(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidPattern(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            CacheError::Backend(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let CacheError::RateLimited { retry_after_secs } = self {
            let body = Json(json!({
                "error": "Too many requests, please try again later",
                "retryAfter": retry_after_secs,
            }));
            let mut response = (status, body).into_response();
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs),
            );
            return response;
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
