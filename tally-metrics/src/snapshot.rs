use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// An immutable, point-in-time copy of all metric state.
///
/// A snapshot is produced once per flush interval. The raw maps (`counters`, `gauges`,
/// `timers`, `timer_counts`, `sets`) are deep copies taken atomically from the live store and
/// never alias it; the derived maps (`counter_rates`, `timer_data`, `internal`) are filled in
/// by [`process`](crate::process) afterwards.
///
/// Snapshots are handed to every flush subscriber in turn and dropped at the end of the cycle;
/// the engine retains nothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Accumulated counter values by key, including the engine's own meta-counters.
    pub counters: BTreeMap<String, i64>,
    /// Per-second rates for every counter, derived from the flush interval.
    pub counter_rates: BTreeMap<String, i64>,
    /// Last-value gauges by key.
    pub gauges: BTreeMap<String, i64>,
    /// Raw timer samples recorded this interval, sorted ascending once processed.
    pub timers: BTreeMap<String, Vec<i64>>,
    /// Sample-rate-extrapolated timer counts by key.
    ///
    /// This may exceed the stored sample count when samples were submitted with a sample rate
    /// below `1.0`.
    pub timer_counts: BTreeMap<String, i64>,
    /// Derived timer statistics by key.
    pub timer_data: BTreeMap<String, TimerData>,
    /// Unique set members observed this interval, by key.
    pub sets: BTreeMap<String, BTreeSet<String>>,
    /// Engine self-metrics, such as `processing_time`.
    pub internal: BTreeMap<String, i64>,
}

/// Derived statistics for one timer key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerData {
    /// The extrapolated number of measurements this interval.
    pub count: i64,
    /// Measurements per second over the flush interval.
    pub count_ps: i64,
    /// Detail statistics, absent if no samples were recorded this interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<TimerSummary>,
}

impl TimerData {
    /// Flattens the statistics into `(name, value)` pairs.
    ///
    /// The names follow the conventional statsd output key space: `count_90`, `mean_90`,
    /// `upper_90`, ... for each configured threshold, followed by `std`, `upper`, `lower`,
    /// `count`, `count_ps`, `sum`, `sum_squares`, `mean` and `median`. Idle timers yield only
    /// `count` and `count_ps`.
    pub fn entries(&self) -> Vec<(String, i64)> {
        let mut entries = Vec::new();

        if let Some(summary) = &self.summary {
            for pct in &summary.percentiles {
                let suffix = pct.suffix();
                entries.push((format!("count_{suffix}"), pct.count));
                entries.push((format!("mean_{suffix}"), pct.mean));
                entries.push((pct.boundary_name(), pct.boundary));
                entries.push((format!("sum_{suffix}"), pct.sum));
                entries.push((format!("sum_squares_{suffix}"), pct.sum_squares));
            }

            entries.push(("std".to_owned(), summary.std));
            entries.push(("upper".to_owned(), summary.upper));
            entries.push(("lower".to_owned(), summary.lower));
        }

        entries.push(("count".to_owned(), self.count));
        entries.push(("count_ps".to_owned(), self.count_ps));

        if let Some(summary) = &self.summary {
            entries.push(("sum".to_owned(), summary.sum));
            entries.push(("sum_squares".to_owned(), summary.sum_squares));
            entries.push(("mean".to_owned(), summary.mean));
            entries.push(("median".to_owned(), summary.median));
        }

        entries
    }
}

/// Whole-population statistics over the sorted samples of one timer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerSummary {
    /// Sum of all samples.
    pub sum: i64,
    /// Sum of all squared samples.
    pub sum_squares: i64,
    /// Mean sample value, rounded to the nearest integer.
    pub mean: i64,
    /// Middle sample for an odd number of samples, otherwise the truncated average of the two
    /// middle samples.
    pub median: i64,
    /// Integer-truncated standard deviation.
    pub std: i64,
    /// The largest sample.
    pub upper: i64,
    /// The smallest sample.
    pub lower: i64,
    /// Trimmed statistics per configured percentile threshold.
    pub percentiles: Vec<PercentileData>,
}

/// Trimmed statistics for one percentile threshold.
///
/// A positive threshold `p` covers the lowest `round(p/100 * n)` samples, reported under
/// `upper_<p>` names: the conventional "p-th percentile excluding the top outliers". A negative
/// threshold covers the same number of samples counted from the top instead, reported under
/// `lower_top<|p|>` names. This naming is inherited statsd convention and deliberately kept,
/// even where it reads backwards.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PercentileData {
    /// The configured threshold, negative for top-percentiles.
    pub threshold: i32,
    /// The number of samples within the threshold.
    pub count: i64,
    /// Mean of the samples within the threshold, rounded to the nearest integer.
    pub mean: i64,
    /// The boundary sample value at the threshold.
    pub boundary: i64,
    /// Sum of the samples within the threshold.
    pub sum: i64,
    /// Sum of the squared samples within the threshold.
    pub sum_squares: i64,
}

impl PercentileData {
    /// Returns the key suffix for this threshold: `"90"` for `90`, `"top90"` for `-90`.
    pub fn suffix(&self) -> String {
        if self.threshold < 0 {
            format!("top{}", self.threshold.unsigned_abs())
        } else {
            self.threshold.to_string()
        }
    }

    /// Returns the name of the boundary statistic: `upper_<suffix>` for positive thresholds,
    /// `lower_<suffix>` for negative ones.
    pub fn boundary_name(&self) -> String {
        let prefix = if self.threshold > 0 { "upper" } else { "lower" };
        format!("{prefix}_{}", self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_timer_entries_idle() {
        let data = TimerData::default();
        assert_eq!(
            data.entries(),
            vec![("count".to_owned(), 0), ("count_ps".to_owned(), 0)]
        );
    }

    #[test]
    fn test_timer_entries_names() {
        let data = TimerData {
            count: 10,
            count_ps: 1,
            summary: Some(TimerSummary {
                percentiles: vec![
                    PercentileData {
                        threshold: 90,
                        ..Default::default()
                    },
                    PercentileData {
                        threshold: -90,
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
        };

        let names: Vec<String> = data.entries().into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec![
                "count_90",
                "mean_90",
                "upper_90",
                "sum_90",
                "sum_squares_90",
                "count_top90",
                "mean_top90",
                "lower_top90",
                "sum_top90",
                "sum_squares_top90",
                "std",
                "upper",
                "lower",
                "count",
                "count_ps",
                "sum",
                "sum_squares",
                "mean",
                "median",
            ]
        );
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut snapshot = Snapshot::default();
        snapshot.counters.insert("endpoint.hits".to_owned(), 21);
        snapshot.counter_rates.insert("endpoint.hits".to_owned(), 2);

        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, restored);
    }
}
