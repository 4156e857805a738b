//! App Cache - an in-process application cache layer
//!
//! Domain-partitioned TTL caches with pattern-based invalidation, domain
//! invalidation orchestrators, an invalidation health monitor and a
//! fixed-window rate limiter, plus an admin HTTP surface.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod health;
pub mod invalidation;
pub mod models;
pub mod orchestrator;
pub mod rate_limit;
pub mod tasks;

pub use config::Config;
pub use context::AppContext;
pub use error::{CacheError, Result};
pub use tasks::BackgroundTasks;
