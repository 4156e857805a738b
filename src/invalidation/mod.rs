//! Invalidation Module
//!
//! Removes stale entries by exact key or wildcard pattern across cache
//! instances and reports each deletion to the health monitor.

mod pattern;
mod result;
mod rules;
mod service;

pub use pattern::KeyPattern;
pub use result::{summarize, InvalidationResult, InvalidationTarget};
pub use rules::{default_rules, resolve_targets, InvalidationRule};
pub use service::{InvalidationService, DEFAULT_REASON};
