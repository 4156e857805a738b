//! Cache Module
//!
//! Provides the named in-memory cache instances with TTL expiration and LRU
//! eviction, plus the key scheme shared by readers and invalidators.

mod domain;
mod entry;
mod instance;
pub mod keys;
mod recency;
mod registry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use domain::CacheDomain;
pub use entry::CacheEntry;
pub use instance::{CacheInstance, InstanceStats};
pub use keys::{KeyKind, KeyPart};
pub use recency::RecencyIndex;
pub use registry::CacheRegistry;
pub use stats::{CacheStats, SizeEstimate};
pub use store::CacheStore;
