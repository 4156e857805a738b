//! Health report types and scoring.

use serde::Serialize;

use super::{Impact, InvalidationStats};
use crate::config::HealthMonitorConfig;

/// Share of low-impact keys at or above which the cache counts as healthy.
const HEALTHY_RATIO: f64 = 0.8;

// == Report Types ==

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationLevel {
    Success,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub level: RecommendationLevel,
    pub message: String,
}

/// One key as listed in reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyHealth {
    pub key: String,
    pub count: u64,
    pub frequency: f64,
    pub impact: Impact,
    pub last_invalidation: u64,
}

impl KeyHealth {
    pub fn new(key: &str, stats: &InvalidationStats) -> Self {
        Self {
            key: key.to_string(),
            count: stats.count,
            frequency: stats.frequency,
            impact: stats.impact,
            last_invalidation: stats.last_invalidation,
        }
    }
}

/// Tracked keys counted by impact tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    pub total_keys: usize,
    pub low_impact: usize,
    pub medium_impact: usize,
    pub high_impact: usize,
}

impl StatsOverview {
    pub fn add(&mut self, impact: Impact) {
        self.total_keys += 1;
        match impact {
            Impact::Low => self.low_impact += 1,
            Impact::Medium => self.medium_impact += 1,
            Impact::High => self.high_impact += 1,
        }
    }
}

/// Keys invalidated within the real-time window, busiest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeStatus {
    pub window_ms: u64,
    #[serde(flatten)]
    pub overview: StatsOverview,
    pub keys: Vec<KeyHealth>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// RFC 3339 generation time
    pub generated_at: String,
    pub total_keys: usize,
    pub total_invalidations: u64,
    pub average_frequency: f64,
    /// High-impact keys, highest frequency first
    pub high_frequency_keys: Vec<KeyHealth>,
    pub recommendations: Vec<Recommendation>,
    /// 0 (unhealthy) to 100 (healthy)
    pub health_score: u32,
}

// == Scoring ==

/// Score of a single key: 100 minus penalties for frequency tier, impact tier
/// and absolute count, floored at 0.
pub fn key_score(stats: &InvalidationStats, config: &HealthMonitorConfig) -> u32 {
    let frequency_penalty = if stats.frequency > config.high_threshold {
        40
    } else if stats.frequency > config.medium_threshold {
        20
    } else {
        0
    };

    let impact_penalty = match stats.impact {
        Impact::High => 30,
        Impact::Medium => 15,
        Impact::Low => 0,
    };

    let count_penalty = if stats.count > 100 {
        20
    } else if stats.count > 50 {
        10
    } else {
        0
    };

    100u32.saturating_sub(frequency_penalty + impact_penalty + count_penalty)
}

/// Mean of the per-key scores; 100 when nothing is tracked.
pub fn overall_score<'a>(
    stats: impl IntoIterator<Item = &'a InvalidationStats>,
    config: &HealthMonitorConfig,
) -> u32 {
    let (sum, keys) = stats
        .into_iter()
        .fold((0u64, 0u64), |(sum, keys), s| (sum + key_score(s, config) as u64, keys + 1));

    if keys == 0 {
        100
    } else {
        (sum as f64 / keys as f64).round() as u32
    }
}

/// Advice derived from the tier counts.
pub fn recommendations(
    overview: &StatsOverview,
    high_frequency_keys: &[KeyHealth],
    config: &HealthMonitorConfig,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if !high_frequency_keys.is_empty() {
        let names: Vec<&str> = high_frequency_keys
            .iter()
            .take(5)
            .map(|k| k.key.as_str())
            .collect();
        out.push(Recommendation {
            level: RecommendationLevel::Warning,
            message: format!(
                "{} key(s) invalidated more than {}/min ({}). Consider longer TTLs, \
                 batching writes or narrower invalidation patterns.",
                high_frequency_keys.len(),
                config.high_threshold,
                names.join(", ")
            ),
        });
    }

    if overview.medium_impact > 0 {
        out.push(Recommendation {
            level: RecommendationLevel::Info,
            message: format!(
                "{} key(s) show moderate invalidation frequency; keep an eye on them.",
                overview.medium_impact
            ),
        });
    }

    if overview.total_keys == 0 {
        out.push(Recommendation {
            level: RecommendationLevel::Success,
            message: "No invalidation activity recorded.".to_string(),
        });
        return out;
    }

    let healthy_ratio = overview.low_impact as f64 / overview.total_keys as f64;
    let percent = (healthy_ratio * 100.0).round();
    if healthy_ratio >= HEALTHY_RATIO {
        out.push(Recommendation {
            level: RecommendationLevel::Success,
            message: format!("Cache health is good: {percent}% of tracked keys are stable."),
        });
    } else {
        out.push(Recommendation {
            level: RecommendationLevel::Warning,
            message: format!(
                "Only {percent}% of tracked keys are stable; review the invalidation strategy."
            ),
        });
    }

    out
}
