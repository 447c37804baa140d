//! The in-memory aggregation engine.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::protocol::{Sample, SampleValue};
use crate::snapshot::Snapshot;
use crate::statistics;
use tally_common::UnixTimestamp;

mod config;
mod hooks;
mod store;

pub use self::config::CollectorConfig;
pub use self::hooks::HookError;

use self::hooks::Hooks;
use self::store::Store;

/// Counter tracking the number of packets fed into [`Collector::handle`].
pub const PACKETS_RECEIVED: &str = "packets_received";

/// Counter tracking the number of protocol lines received, valid or not.
pub const METRICS_RECEIVED: &str = "metrics_received";

/// Counter tracking the number of malformed protocol lines.
pub const BAD_LINES_SEEN: &str = "bad_lines_seen";

/// Gauge reporting the scheduling drift of the previous flush interval in seconds.
///
/// Computed as `flush timestamp - previous flush timestamp - interval`; absent until the
/// second flush.
pub const TIMESTAMP_LAG_GAUGE: &str = "timestamp_lag_namespace";

/// Internal metric reporting the statistics computation time in seconds.
pub const PROCESSING_TIME: &str = "processing_time";

/// The engine's own health counters. Always present, reset but never removed.
pub const META_COUNTERS: &[&str] = &[PACKETS_RECEIVED, METRICS_RECEIVED, BAD_LINES_SEEN];

pub(crate) fn is_protected_counter(key: &str) -> bool {
    META_COUNTERS.contains(&key)
}

/// The statsd aggregation engine.
///
/// A collector accumulates decoded metric samples in four keyed namespaces (counters, gauges,
/// timers, sets) and periodically flushes them: the accumulated state is copied into an
/// immutable [`Snapshot`], reset according to the configured idle-deletion policy, enriched
/// with derived statistics, and handed to every registered flush subscriber.
///
/// # Concurrency
///
/// All ingestion operations take `&self` and are safe to call from any number of threads. They
/// synchronize with the flush through a reader/writer lock in an intentionally inverted role:
/// ingestion holds the *shared* side (the maps support concurrent insert-or-update, so many
/// producers proceed in parallel), while the flush's snapshot-and-reset step briefly takes the
/// *exclusive* side. Statistics computation and subscriber invocation happen outside the lock,
/// so a slow subscriber delays the next flush but never blocks ingestion.
///
/// A snapshot reflects exactly the ingestion calls that completed before the exclusive section
/// was entered; racing calls land fully in the next interval.
///
/// # Example
///
/// ```
/// use tally_metrics::{Collector, CollectorConfig};
///
/// let collector = Collector::new(CollectorConfig::default());
/// collector.handle(b"endpoint.hits:1|c\nendpoint.response_time:57|ms");
///
/// let snapshot = collector.flush();
/// assert_eq!(snapshot.counters["endpoint.hits"], 1);
/// ```
pub struct Collector {
    config: CollectorConfig,
    /// Flush gate. Ingestion shared, snapshot-and-reset exclusive.
    gate: RwLock<()>,
    store: Store,
    hooks: Hooks,
    /// Timestamp of the previous flush in seconds, `0` before the first flush.
    last_flush: AtomicU64,
    flushing: AtomicBool,
    timer_started: AtomicBool,
}

impl Collector {
    /// Creates a collector with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configured flush interval is zero.
    pub fn new(config: CollectorConfig) -> Self {
        assert!(
            config.flush_interval_ms > 0,
            "flush interval must be positive"
        );

        Self {
            config,
            gate: RwLock::new(()),
            store: Store::new(),
            hooks: Hooks::default(),
            last_flush: AtomicU64::new(0),
            flushing: AtomicBool::new(false),
            timer_started: AtomicBool::new(false),
        }
    }

    /// Returns the collector's configuration.
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Decodes one packet payload and applies all its samples.
    ///
    /// Increments [`PACKETS_RECEIVED`] once and [`METRICS_RECEIVED`] once per non-empty line.
    /// Malformed lines only increment [`BAD_LINES_SEEN`]; they never affect the remaining
    /// lines of the packet.
    pub fn handle(&self, packet: &[u8]) {
        let _gate = self.gate.read();
        self.store.add_to_counter(PACKETS_RECEIVED, 1);

        for result in Sample::parse_all(packet) {
            self.store.add_to_counter(METRICS_RECEIVED, 1);
            match result {
                Ok(sample) => self.apply(sample),
                Err(_) => self.store.add_to_counter(BAD_LINES_SEEN, 1),
            }
        }
    }

    /// Applies a decoded sample. The caller must hold the shared flush gate.
    fn apply(&self, sample: Sample) {
        let Sample {
            key,
            value,
            sample_rate,
        } = sample;

        match value {
            SampleValue::Counter(delta) => {
                self.store.add_to_counter(&key, scaled(delta, sample_rate))
            }
            SampleValue::Gauge { value, delta } => {
                if delta {
                    self.store.add_to_gauge(&key, value);
                } else {
                    self.store.set_gauge(&key, value);
                }
            }
            SampleValue::Timer(value) => {
                self.store
                    .add_to_timer(&key, value, extrapolated_count(sample_rate))
            }
            SampleValue::Set(member) => self.store.add_to_set(&key, member),
        }
    }

    /// Accumulates `round(delta / sample_rate)` into a counter.
    pub fn add_to_counter(&self, key: &str, delta: i64, sample_rate: f64) {
        let _gate = self.gate.read();
        self.store.add_to_counter(key, scaled(delta, sample_rate));
    }

    /// Sets a gauge to an absolute value.
    pub fn set_gauge(&self, key: &str, value: i64) {
        let _gate = self.gate.read();
        self.store.set_gauge(key, value);
    }

    /// Adjusts a gauge by a relative delta.
    ///
    /// The first write to an unknown key stores the delta as an absolute value.
    pub fn add_to_gauge(&self, key: &str, delta: i64) {
        let _gate = self.gate.read();
        self.store.add_to_gauge(key, delta);
    }

    /// Records one timer measurement and extrapolates the measurement count by the inverse
    /// sample rate.
    pub fn add_to_timer(&self, key: &str, value: i64, sample_rate: f64) {
        let _gate = self.gate.read();
        self.store
            .add_to_timer(key, value, extrapolated_count(sample_rate));
    }

    /// Records a member in a unique-value set. Duplicates within an interval coalesce.
    pub fn add_to_set(&self, key: &str, member: impl Into<String>) {
        let _gate = self.gate.read();
        self.store.add_to_set(key, member.into());
    }

    /// Bumps [`METRICS_RECEIVED`] on behalf of a collaborator that injects metrics without
    /// going through [`Collector::handle`].
    pub fn increment_metrics_received(&self, count: i64) {
        let _gate = self.gate.read();
        self.store.add_to_counter(METRICS_RECEIVED, count);
    }

    /// Registers a callback invoked at the start of every flush, before the snapshot is taken.
    ///
    /// The callback runs outside any lock and may call ingestion operations, typically to
    /// record instantaneous gauges.
    pub fn register_before_flush<F>(&self, hook: F)
    where
        F: Fn(&Collector) + Send + Sync + 'static,
    {
        self.hooks.register_before_flush(Arc::new(hook));
    }

    /// Registers a flush subscriber.
    ///
    /// Subscribers run in registration order and receive the flush timestamp together with the
    /// finished snapshot. A subscriber returning an error is reported to the error subscribers
    /// and does not prevent the remaining subscribers from running.
    pub fn register_on_flush<F>(&self, hook: F)
    where
        F: Fn(UnixTimestamp, &Snapshot) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.hooks.register_on_flush(Arc::new(hook));
    }

    /// Registers a callback receiving every error raised by a flush subscriber.
    pub fn register_on_flush_error<F>(&self, hook: F)
    where
        F: Fn(&HookError) + Send + Sync + 'static,
    {
        self.hooks.register_on_flush_error(Arc::new(hook));
    }

    /// Runs one flush cycle and returns the snapshot.
    ///
    /// The cycle invokes the before-flush callbacks, records the scheduling drift gauge, takes
    /// the snapshot under the exclusive gate, resets the store, computes derived statistics,
    /// and invokes all flush subscribers.
    ///
    /// # Panics
    ///
    /// Panics when called re-entrantly, i.e. from within one of its own callbacks. That is a
    /// caller bug, not a runtime condition.
    pub fn flush(&self) -> Snapshot {
        assert!(
            !self.flushing.swap(true, Ordering::SeqCst),
            "flush is already in progress; flush must not be called re-entrantly"
        );
        let _reset = FlushGuard(&self.flushing);

        for hook in self.hooks.before_flush_hooks() {
            hook(self);
        }

        let timestamp = UnixTimestamp::now();
        let interval = self.config.flush_interval();

        let previous = self.last_flush.swap(timestamp.as_secs(), Ordering::Relaxed);
        if previous > 0 {
            let lag =
                timestamp.as_secs() as i64 - previous as i64 - interval.as_secs() as i64;
            self.set_gauge(TIMESTAMP_LAG_GAUGE, lag);
        }

        let mut snapshot = {
            let _gate = self.gate.write();
            self.store.snapshot_and_reset(&self.config)
        };

        statistics::process(&mut snapshot, interval, &self.config.percentile_thresholds);

        for hook in self.hooks.on_flush_hooks() {
            if let Err(error) = hook(timestamp, &snapshot) {
                tally_log::debug!("flush subscriber failed: {error}");
                for error_hook in self.hooks.on_flush_error_hooks() {
                    error_hook(&error);
                }
            }
        }

        snapshot
    }

    /// Starts the periodic flush driven by a background tokio task.
    ///
    /// Idempotent; subsequent calls have no effect. Must be called within a tokio runtime.
    pub fn start_flush_timer(self: &Arc<Self>) {
        if self.timer_started.swap(true, Ordering::SeqCst) {
            tally_log::debug!("flush timer already running");
            return;
        }

        let collector = Arc::clone(self);
        let period = self.config.flush_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                collector.flush();
            }
        });

        tally_log::info!("flushing every {}ms", period.as_millis());
    }
}

/// Clears the single-flight marker even if a flush callback panics.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn scaled(value: i64, sample_rate: f64) -> i64 {
    (value as f64 * (1.0 / sample_rate)).round() as i64
}

fn extrapolated_count(sample_rate: f64) -> i64 {
    (1.0 / sample_rate).round() as i64
}
