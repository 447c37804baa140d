use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parameters used by the [`Collector`](crate::Collector).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Interval between flushes in milliseconds.
    ///
    /// Defaults to `10000`. Every flush resets the accumulated counters, timers and sets, so
    /// this defines the granularity of all reported values.
    pub flush_interval_ms: u64,

    /// Percentile thresholds for timer statistics.
    ///
    /// Each threshold adds a trimmed statistics bundle per timer. Negative thresholds compute
    /// from the top of the distribution instead of the bottom.
    ///
    /// Defaults to `[90]`.
    pub percentile_thresholds: Vec<i32>,

    /// Removes idle metrics of every kind instead of reporting zero or empty values.
    ///
    /// Shorthand for enabling all four `delete_*` flags below. Defaults to `false`.
    pub delete_idle_stats: bool,

    /// Removes counters at flush instead of resetting them to zero.
    ///
    /// The engine's own meta-counters are exempt and always reset in place.
    pub delete_counters: bool,

    /// Removes timers at flush instead of keeping them with empty samples.
    pub delete_timers: bool,

    /// Removes sets at flush instead of keeping them empty.
    pub delete_sets: bool,

    /// Removes gauges that received no update during the interval.
    ///
    /// Gauges with activity keep their last value across flushes regardless of this flag.
    pub delete_gauges: bool,
}

impl CollectorConfig {
    /// Returns the flush interval as a duration.
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub(crate) fn delete_counters(&self) -> bool {
        self.delete_idle_stats || self.delete_counters
    }

    pub(crate) fn delete_timers(&self) -> bool {
        self.delete_idle_stats || self.delete_timers
    }

    pub(crate) fn delete_sets(&self) -> bool {
        self.delete_idle_stats || self.delete_sets
    }

    pub(crate) fn delete_gauges(&self) -> bool {
        self.delete_idle_stats || self.delete_gauges
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 10_000,
            percentile_thresholds: vec![90],
            delete_idle_stats: false,
            delete_counters: false,
            delete_timers: false,
            delete_sets: false,
            delete_gauges: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = CollectorConfig::default();
        assert_eq!(config.flush_interval(), Duration::from_secs(10));
        assert_eq!(config.percentile_thresholds, vec![90]);
        assert!(!config.delete_counters());
    }

    #[test]
    fn test_delete_idle_shorthand() {
        let config = CollectorConfig {
            delete_idle_stats: true,
            ..Default::default()
        };

        assert!(config.delete_counters());
        assert!(config.delete_timers());
        assert!(config.delete_sets());
        assert!(config.delete_gauges());
    }
}
