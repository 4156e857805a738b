//! Per-key invalidation statistics.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::HealthMonitorConfig;

const MINUTE_MS: f64 = 60_000.0;

// == Impact ==
/// How disruptive a key's invalidation rate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    /// Tier of a frequency (invalidations/minute). Thresholds must be exceeded,
    /// not merely reached.
    pub fn classify(frequency: f64, config: &HealthMonitorConfig) -> Self {
        if frequency > config.high_threshold {
            Impact::High
        } else if frequency > config.medium_threshold {
            Impact::Medium
        } else {
            Impact::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
        }
    }
}

// == Invalidation Stats ==
/// Invalidation history of one cache key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidationStats {
    /// Total invalidations recorded
    pub count: u64,
    /// Timestamp of the latest invalidation (Unix ms)
    pub last_invalidation: u64,
    /// Exponentially smoothed invalidations per minute
    pub frequency: f64,
    pub impact: Impact,
    /// Most recent reasons, oldest first
    pub reasons: VecDeque<String>,
}

impl InvalidationStats {
    /// Stats of a key invalidated for the first time. No interval exists yet,
    /// so the frequency starts at zero.
    pub(crate) fn first(now: u64, reason: &str) -> Self {
        Self {
            count: 1,
            last_invalidation: now,
            frequency: 0.0,
            impact: Impact::Low,
            reasons: VecDeque::from([reason.to_string()]),
        }
    }

    /// Folds one more invalidation into the stats.
    ///
    /// `frequency = frequency * (1 - w) + (1 / minutes_since_last) * w`, with
    /// the interval floored at one millisecond.
    pub(crate) fn record(&mut self, now: u64, reason: &str, config: &HealthMonitorConfig) {
        let elapsed_ms = now.saturating_sub(self.last_invalidation).max(1);
        let sample = MINUTE_MS / elapsed_ms as f64;
        let weight = config.smoothing_weight;

        self.frequency = self.frequency * (1.0 - weight) + sample * weight;
        self.count += 1;
        self.last_invalidation = now;
        self.impact = Impact::classify(self.frequency, config);

        self.reasons.push_back(reason.to_string());
        while self.reasons.len() > config.max_reasons {
            self.reasons.pop_front();
        }
    }

    /// Copy of the stats as seen at `now`: the frequency halves for every
    /// `decay_half_life_ms` of idle time and the impact follows it.
    pub fn decayed(&self, now: u64, config: &HealthMonitorConfig) -> Self {
        let mut view = self.clone();
        if config.decay_half_life_ms == 0 {
            return view;
        }

        let idle_ms = now.saturating_sub(self.last_invalidation) as f64;
        let half_lives = idle_ms / config.decay_half_life_ms as f64;
        view.frequency = self.frequency * 0.5_f64.powf(half_lives);
        view.impact = Impact::classify(view.frequency, config);
        view
    }
}
