use std::io::{self, Write};

use tally_common::UnixTimestamp;
use tally_metrics::{Collector, Snapshot};

/// Registers a flush subscriber that renders every snapshot to stdout.
///
/// The output uses the conventional flat statsd key space, one `name = value` line per
/// statistic, bracketed by `Flush=` and `Flush End=` markers.
pub fn subscribe_console(collector: &Collector) {
    collector.register_on_flush(|timestamp, snapshot| {
        let stdout = io::stdout();
        render(timestamp, snapshot, &mut stdout.lock())?;
        Ok(())
    });
}

fn render(
    timestamp: UnixTimestamp,
    snapshot: &Snapshot,
    out: &mut impl Write,
) -> io::Result<()> {
    writeln!(out, "Flush={timestamp}")?;

    for (key, value) in &snapshot.counters {
        let rate = snapshot.counter_rates.get(key).copied().unwrap_or(0);
        writeln!(out, "stats.counters.{key}.count = {value}")?;
        writeln!(out, "stats.counters.{key}.rate = {rate}")?;
    }

    for (key, data) in &snapshot.timer_data {
        for (name, value) in data.entries() {
            writeln!(out, "stats.timers.{key}.{name} = {value}")?;
        }
    }

    for (key, value) in &snapshot.gauges {
        writeln!(out, "stats.gauges.{key} = {value}")?;
    }

    for (key, members) in &snapshot.sets {
        writeln!(out, "stats.sets.{key}.count = {}", members.len())?;
    }

    writeln!(out, "Flush End={timestamp}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use tally_metrics::{CollectorConfig, process};

    use super::*;

    #[test]
    fn test_render() {
        let collector = Collector::new(CollectorConfig::default());
        collector.handle(b"endpoint.hits:21|c\nqueue.depth:7|g\nendpoint.users:alice|s");

        let mut snapshot = collector.flush();
        snapshot.counters.retain(|key, _| key == "endpoint.hits");
        snapshot.counter_rates.retain(|key, _| key == "endpoint.hits");

        let mut out = Vec::new();
        render(UnixTimestamp::from_secs(1615889449), &snapshot, &mut out).unwrap();
        let rendered = String::from_utf8(out).unwrap();

        assert_eq!(
            rendered,
            "\
Flush=1615889449
stats.counters.endpoint.hits.count = 21
stats.counters.endpoint.hits.rate = 2
stats.gauges.queue.depth = 7
stats.sets.endpoint.users.count = 1
Flush End=1615889449
"
        );
    }

    #[test]
    fn test_render_timer_stats() {
        let mut snapshot = Snapshot::default();
        snapshot.timers.insert("t".to_owned(), vec![1, 2, 3]);
        snapshot.timer_counts.insert("t".to_owned(), 3);
        process(&mut snapshot, std::time::Duration::from_secs(10), &[90]);

        let mut out = Vec::new();
        render(UnixTimestamp::from_secs(0), &snapshot, &mut out).unwrap();
        let rendered = String::from_utf8(out).unwrap();

        assert!(rendered.contains("stats.timers.t.upper_90 = 3"));
        assert!(rendered.contains("stats.timers.t.median = 2"));
        assert!(rendered.contains("stats.timers.t.count_ps = 0"));
    }
}
