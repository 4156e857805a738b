//! Cache Health Monitor
//!
//! Records every invalidation per cache key and derives frequency, impact
//! tier and an overall health score from that history.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::report::{self, HealthReport, KeyHealth, RealTimeStatus, StatsOverview};
use super::{Impact, InvalidationStats};
use crate::clock::{system_clock, SharedClock};
use crate::config::HealthMonitorConfig;

// == Health Monitor ==
/// Shared invalidation tracker.
///
/// Each key's record is updated atomically through its map shard; no
/// operation here fails.
#[derive(Debug)]
pub struct HealthMonitor {
    stats: DashMap<String, InvalidationStats>,
    config: HealthMonitorConfig,
    clock: SharedClock,
}

impl HealthMonitor {
    pub fn new(config: HealthMonitorConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: HealthMonitorConfig, clock: SharedClock) -> Self {
        Self {
            stats: DashMap::new(),
            config,
            clock,
        }
    }

    pub fn config(&self) -> &HealthMonitorConfig {
        &self.config
    }

    // == Record Invalidation ==
    /// Folds one invalidation of `key` into its record.
    pub fn record_invalidation(&self, key: &str, reason: &str) {
        let now = self.clock.now_ms();

        let (previous, current) = match self.stats.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let stats = occupied.get_mut();
                let previous = stats.impact;
                stats.record(now, reason, &self.config);
                (Some(previous), stats.clone())
            }
            Entry::Vacant(vacant) => {
                let stats = vacant.insert(InvalidationStats::first(now, reason));
                (None, stats.clone())
            }
        };

        debug!(
            key,
            reason,
            count = current.count,
            frequency = format_args!("{:.2}", current.frequency),
            impact = current.impact.as_str(),
            "Cache invalidation recorded"
        );

        if current.impact == Impact::High && previous != Some(Impact::High) {
            warn!(
                key,
                frequency = format_args!("{:.2}", current.frequency),
                "Cache key entered high invalidation impact"
            );
        }
    }

    // == Queries ==
    /// Stats of `key` as seen now, frequency decayed by idle time.
    pub fn key_stats(&self, key: &str) -> Option<InvalidationStats> {
        let now = self.clock.now_ms();
        self.stats
            .get(key)
            .map(|stats| stats.decayed(now, &self.config))
    }

    /// Tracked keys counted by impact tier.
    pub fn stats_overview(&self) -> StatsOverview {
        let mut overview = StatsOverview::default();
        for (_, stats) in self.snapshot() {
            overview.add(stats.impact);
        }
        overview
    }

    /// Keys invalidated within the real-time window, highest frequency first.
    pub fn real_time_status(&self) -> RealTimeStatus {
        let now = self.clock.now_ms();
        let since = now.saturating_sub(self.config.realtime_window_ms);

        let mut overview = StatsOverview::default();
        let mut keys: Vec<KeyHealth> = self
            .snapshot()
            .into_iter()
            .filter(|(_, stats)| stats.last_invalidation >= since)
            .map(|(key, stats)| {
                overview.add(stats.impact);
                KeyHealth::new(&key, &stats)
            })
            .collect();
        sort_by_frequency(&mut keys);

        RealTimeStatus {
            window_ms: self.config.realtime_window_ms,
            overview,
            keys,
        }
    }

    // == Health Report ==
    /// Aggregated health of every tracked key.
    pub fn health_report(&self) -> HealthReport {
        let snapshot = self.snapshot();

        let mut overview = StatsOverview::default();
        let mut total_invalidations = 0u64;
        let mut frequency_sum = 0.0;
        let mut high_frequency_keys = Vec::new();

        for (key, stats) in &snapshot {
            overview.add(stats.impact);
            total_invalidations += stats.count;
            frequency_sum += stats.frequency;
            if stats.impact == Impact::High {
                high_frequency_keys.push(KeyHealth::new(key, stats));
            }
        }
        sort_by_frequency(&mut high_frequency_keys);

        let average_frequency = if snapshot.is_empty() {
            0.0
        } else {
            frequency_sum / snapshot.len() as f64
        };

        HealthReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            total_keys: snapshot.len(),
            total_invalidations,
            average_frequency,
            recommendations: report::recommendations(&overview, &high_frequency_keys, &self.config),
            health_score: report::overall_score(snapshot.iter().map(|(_, s)| s), &self.config),
            high_frequency_keys,
        }
    }

    // == Maintenance ==
    /// Drops records idle for longer than the retention window.
    pub fn cleanup_stale(&self) -> usize {
        let cutoff = self.clock.now_ms().saturating_sub(self.config.retention_ms);
        let before = self.stats.len();
        self.stats.retain(|_, stats| stats.last_invalidation >= cutoff);
        before.saturating_sub(self.stats.len())
    }

    /// One background cycle: drop stale records, then log the overview and
    /// any high-impact keys.
    pub fn sweep(&self) -> usize {
        let removed = self.cleanup_stale();
        let overview = self.stats_overview();

        info!(
            removed,
            total = overview.total_keys,
            low = overview.low_impact,
            medium = overview.medium_impact,
            high = overview.high_impact,
            "Cache health overview"
        );

        if overview.high_impact > 0 {
            let hot: Vec<String> = self
                .snapshot()
                .into_iter()
                .filter(|(_, stats)| stats.impact == Impact::High)
                .map(|(key, stats)| format!("{key} ({:.1}/min)", stats.frequency))
                .collect();
            warn!(keys = ?hot, "High-impact cache keys");
        }

        removed
    }

    /// Forgets every tracked key.
    pub fn reset(&self) {
        self.stats.clear();
        info!("Cache health monitor reset");
    }

    pub fn tracked_keys(&self) -> usize {
        self.stats.len()
    }

    /// Decayed copies of every record.
    fn snapshot(&self) -> Vec<(String, InvalidationStats)> {
        let now = self.clock.now_ms();
        self.stats
            .iter()
            .map(|item| (item.key().clone(), item.value().decayed(now, &self.config)))
            .collect()
    }
}

fn sort_by_frequency(keys: &mut [KeyHealth]) {
    keys.sort_by(|a, b| b.frequency.total_cmp(&a.frequency));
}
