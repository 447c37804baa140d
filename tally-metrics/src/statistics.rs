use std::time::{Duration, Instant};

use crate::collector::PROCESSING_TIME;
use crate::snapshot::{PercentileData, Snapshot, TimerData, TimerSummary};

/// Computes all derived statistics of a [`Snapshot`] in place.
///
/// This fills `counter_rates` with per-second rates, `timer_data` with the summarized timer
/// statistics for every timer key (sorting the raw samples ascending as a side effect), and
/// records the computation time under `processing_time` in the internal metrics.
///
/// The result is a pure function of the snapshot contents, the flush interval and the
/// configured thresholds. No locks are required; the caller is expected to run this on an
/// already detached snapshot while ingestion proceeds concurrently.
pub fn process(snapshot: &mut Snapshot, flush_interval: Duration, thresholds: &[i32]) {
    let started = Instant::now();
    let interval_secs = flush_interval.as_secs_f64();

    let Snapshot {
        counters,
        counter_rates,
        timers,
        timer_counts,
        timer_data,
        internal,
        ..
    } = snapshot;

    for (key, value) in counters.iter() {
        let rate = (*value as f64 / interval_secs).round() as i64;
        counter_rates.insert(key.clone(), rate);
    }

    for (key, samples) in timers.iter_mut() {
        let count = timer_counts.get(key).copied().unwrap_or(0);
        timer_data.insert(key.clone(), summarize(samples, count, interval_secs, thresholds));
    }

    let processing_time = started.elapsed().as_secs_f64().round() as i64;
    internal.insert(PROCESSING_TIME.to_owned(), processing_time);
}

/// Summarizes the samples of one timer key.
///
/// `count` is the extrapolated measurement count, which exceeds `samples.len()` when samples
/// were submitted with a sample rate below `1.0`.
fn summarize(samples: &mut [i64], count: i64, interval_secs: f64, thresholds: &[i32]) -> TimerData {
    if samples.is_empty() {
        return TimerData::default();
    }

    samples.sort_unstable();

    let n = samples.len();
    let min = samples[0];
    let max = samples[n - 1];

    // Running totals over the sorted samples; index i covers the lowest i + 1 samples.
    let mut cumulative = Vec::with_capacity(n);
    let mut cumulative_squares = Vec::with_capacity(n);
    cumulative.push(min);
    cumulative_squares.push(min * min);
    for i in 1..n {
        cumulative.push(samples[i] + cumulative[i - 1]);
        cumulative_squares.push(samples[i] * samples[i] + cumulative_squares[i - 1]);
    }

    let mut percentiles = Vec::with_capacity(thresholds.len());
    for &threshold in thresholds {
        // Number of samples within the threshold, rounded half away from zero.
        let k = ((threshold.unsigned_abs() as f64 / 100.0) * n as f64).round() as usize;
        if k == 0 {
            continue;
        }
        let k = k.min(n);

        let (boundary, sum, sum_squares) = if threshold > 0 {
            (samples[k - 1], cumulative[k - 1], cumulative_squares[k - 1])
        } else {
            // The highest k samples: total minus the prefix below them.
            let sum = cumulative[n - 1] - if k < n { cumulative[n - k - 1] } else { 0 };
            let sum_squares =
                cumulative_squares[n - 1] - if k < n { cumulative_squares[n - k - 1] } else { 0 };
            (samples[n - k], sum, sum_squares)
        };

        percentiles.push(PercentileData {
            threshold,
            count: k as i64,
            mean: (sum as f64 / k as f64).round() as i64,
            boundary,
            sum,
            sum_squares,
        });
    }

    let sum = cumulative[n - 1];
    let sum_squares = cumulative_squares[n - 1];
    let mean = (sum as f64 / n as f64).round() as i64;

    let mut sum_of_diffs = 0i64;
    for &value in samples.iter() {
        sum_of_diffs += (value - mean) * (value - mean);
    }

    let mid = n / 2;
    let median = if n % 2 == 1 {
        samples[mid]
    } else {
        (samples[mid - 1] + samples[mid]) / 2
    };

    let std = (sum_of_diffs as f64 / n as f64).sqrt() as i64;

    TimerData {
        count,
        count_ps: (count as f64 / interval_secs).round() as i64,
        summary: Some(TimerSummary {
            sum,
            sum_squares,
            mean,
            median,
            std,
            upper: max,
            lower: min,
            percentiles,
        }),
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(10);

    fn process_timer(samples: Vec<i64>, thresholds: &[i32]) -> TimerData {
        let mut snapshot = Snapshot::default();
        let count = samples.len() as i64;
        snapshot.timers.insert("t".to_owned(), samples);
        snapshot.timer_counts.insert("t".to_owned(), count);
        process(&mut snapshot, INTERVAL, thresholds);
        snapshot.timer_data.remove("t").unwrap()
    }

    #[test]
    fn test_counter_rates() {
        let mut snapshot = Snapshot::default();
        snapshot.counters.insert("endpoint.hits".to_owned(), 21);
        snapshot.counters.insert("endpoint.misses".to_owned(), 4);

        process(&mut snapshot, INTERVAL, &[90]);

        // 21 / 10s rounds up, 4 / 10s rounds down.
        assert_eq!(snapshot.counter_rates["endpoint.hits"], 2);
        assert_eq!(snapshot.counter_rates["endpoint.misses"], 0);
        assert!(snapshot.internal.contains_key(PROCESSING_TIME));
    }

    #[test]
    fn test_percentile_boundary() {
        let data = process_timer(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10], &[90]);
        let summary = data.summary.unwrap();

        let pct = &summary.percentiles[0];
        assert_eq!(pct.count, 9);
        assert_eq!(pct.boundary, 9);
        assert_eq!(pct.sum, 45);
        assert_eq!(pct.mean, 5);
        assert_eq!(pct.boundary_name(), "upper_90");
    }

    #[test]
    fn test_percentile_from_top() {
        let data = process_timer(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10], &[-90]);
        let summary = data.summary.unwrap();

        // The highest 9 of 10 samples.
        let pct = &summary.percentiles[0];
        assert_eq!(pct.count, 9);
        assert_eq!(pct.boundary, 2);
        assert_eq!(pct.sum, 54);
        assert_eq!(pct.mean, 6);
        assert_eq!(pct.boundary_name(), "lower_top90");
    }

    #[test]
    fn test_percentile_full_population() {
        let data = process_timer(vec![3, 1, 2], &[-100]);
        let summary = data.summary.unwrap();

        let pct = &summary.percentiles[0];
        assert_eq!(pct.count, 3);
        assert_eq!(pct.boundary, 1);
        assert_eq!(pct.sum, 6);
    }

    #[test]
    fn test_percentile_skipped_below_resolution() {
        // round(5/100 * 3) == 0: no statistic is emitted for this threshold.
        let data = process_timer(vec![1, 2, 3], &[5, 90]);
        let summary = data.summary.unwrap();

        assert_eq!(summary.percentiles.len(), 1);
        assert_eq!(summary.percentiles[0].threshold, 90);
    }

    #[test]
    fn test_median_parity() {
        let even = process_timer(vec![4, 1, 3, 2], &[90]);
        assert_eq!(even.summary.unwrap().median, 2);

        let odd = process_timer(vec![3, 1, 2], &[90]);
        assert_eq!(odd.summary.unwrap().median, 2);
    }

    #[test]
    fn test_population_statistics() {
        let data = process_timer(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10], &[90]);
        assert_eq!(data.count, 10);
        assert_eq!(data.count_ps, 1);

        let summary = data.summary.unwrap();
        assert_eq!(summary.sum, 55);
        assert_eq!(summary.sum_squares, 385);
        assert_eq!(summary.mean, 6);
        assert_eq!(summary.median, 5);
        assert_eq!(summary.upper, 10);
        assert_eq!(summary.lower, 1);
        // Deviations from the rounded mean of 6 sum to 85; sqrt(8.5) = 2.91, truncated.
        assert_eq!(summary.std, 2);
    }

    #[test]
    fn test_single_sample() {
        let data = process_timer(vec![42], &[90]);
        let summary = data.summary.unwrap();

        assert_eq!(summary.mean, 42);
        assert_eq!(summary.median, 42);
        assert_eq!(summary.std, 0);
        assert_eq!(summary.percentiles[0].count, 1);
        assert_eq!(summary.percentiles[0].boundary, 42);
    }

    #[test]
    fn test_idle_timer() {
        let data = process_timer(vec![], &[90]);
        assert_eq!(data.count, 0);
        assert_eq!(data.count_ps, 0);
        assert_eq!(data.summary, None);
    }

    #[test]
    fn test_extrapolated_count() {
        let mut snapshot = Snapshot::default();
        snapshot.timers.insert("t".to_owned(), vec![10, 20]);
        // Submitted at a sample rate of 0.1: two stored samples stand for twenty.
        snapshot.timer_counts.insert("t".to_owned(), 20);

        process(&mut snapshot, INTERVAL, &[90]);

        let data = &snapshot.timer_data["t"];
        assert_eq!(data.count, 20);
        assert_eq!(data.count_ps, 2);
    }

    #[test]
    fn test_samples_sorted_in_snapshot() {
        let mut snapshot = Snapshot::default();
        snapshot.timers.insert("t".to_owned(), vec![9, 1, 5]);
        snapshot.timer_counts.insert("t".to_owned(), 3);

        process(&mut snapshot, INTERVAL, &[90]);

        assert_eq!(snapshot.timers["t"], vec![1, 5, 9]);
    }
}
