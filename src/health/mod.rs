//! Cache Health Module
//!
//! Tracks how often each cache key is invalidated and turns that history
//! into impact tiers, a 0–100 health score and recommendations.
//!
//! Stored frequencies only change when an invalidation is recorded. Every
//! read path reports a frequency decayed by the key's idle time, so a key
//! that burst once and then went quiet does not stay "high impact" forever.

mod monitor;
mod report;
mod stats;

pub use monitor::HealthMonitor;
pub use report::{
    key_score, overall_score, HealthReport, KeyHealth, RealTimeStatus, Recommendation,
    RecommendationLevel, StatsOverview,
};
pub use stats::{Impact, InvalidationStats};
