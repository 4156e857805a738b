//! Rate Limiting Module
//!
//! Fixed-window counters keyed by client identity, plus the axum
//! middleware that puts them in front of a router.

mod limiter;
mod middleware;

pub use limiter::{RateLimitConfig, RateLimitDecision, RateLimitRecord, RateLimiter};
pub use middleware::{client_identity, rate_limit, AuthenticatedUser};
