use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use parking_lot::Mutex;

use super::{is_protected_counter, CollectorConfig};
use crate::snapshot::Snapshot;

/// A gauge value with an activity marker for idle deletion.
#[derive(Debug, Default)]
struct GaugeCell {
    value: AtomicI64,
    /// Set on every write, taken at flush.
    dirty: AtomicBool,
}

/// Timer samples of the current interval plus the extrapolated measurement count.
#[derive(Debug, Default)]
struct TimerReservoir {
    samples: Vec<i64>,
    count: i64,
}

/// The mutable per-interval metric state.
///
/// All maps support concurrent insert-or-update so that many ingestion threads can mutate them
/// while merely holding the shared side of the collector's flush gate. Scalar values are
/// atomics; growing collections sit behind a per-key mutex, which is only ever contended by
/// writers to the same key.
#[derive(Default)]
pub(super) struct Store {
    counters: papaya::HashMap<String, AtomicI64>,
    gauges: papaya::HashMap<String, GaugeCell>,
    timers: papaya::HashMap<String, Mutex<TimerReservoir>>,
    sets: papaya::HashMap<String, Mutex<BTreeSet<String>>>,
}

impl Store {
    pub fn new() -> Self {
        let store = Self::default();

        {
            let counters = store.counters.pin();
            for key in super::META_COUNTERS {
                counters.insert((*key).to_owned(), AtomicI64::new(0));
            }
        }

        store
    }

    pub fn add_to_counter(&self, key: &str, delta: i64) {
        let counters = self.counters.pin();
        match counters.get(key) {
            Some(value) => value.fetch_add(delta, Ordering::Relaxed),
            None => counters
                .get_or_insert_with(key.to_owned(), || AtomicI64::new(0))
                .fetch_add(delta, Ordering::Relaxed),
        };
    }

    pub fn set_gauge(&self, key: &str, value: i64) {
        let gauges = self.gauges.pin();
        let cell = match gauges.get(key) {
            Some(cell) => cell,
            None => gauges.get_or_insert_with(key.to_owned(), GaugeCell::default),
        };

        cell.value.store(value, Ordering::Relaxed);
        cell.dirty.store(true, Ordering::Relaxed);
    }

    pub fn add_to_gauge(&self, key: &str, delta: i64) {
        let gauges = self.gauges.pin();
        match gauges.get(key) {
            Some(cell) => {
                cell.value.fetch_add(delta, Ordering::Relaxed);
                cell.dirty.store(true, Ordering::Relaxed);
            }
            // The first write to a gauge is always absolute.
            None => self.set_gauge(key, delta),
        }
    }

    pub fn add_to_timer(&self, key: &str, value: i64, count: i64) {
        let timers = self.timers.pin();
        let cell = match timers.get(key) {
            Some(cell) => cell,
            None => timers.get_or_insert_with(key.to_owned(), Mutex::default),
        };

        let mut reservoir = cell.lock();
        reservoir.samples.push(value);
        reservoir.count += count;
    }

    pub fn add_to_set(&self, key: &str, member: String) {
        let sets = self.sets.pin();
        let cell = match sets.get(key) {
            Some(cell) => cell,
            None => sets.get_or_insert_with(key.to_owned(), Mutex::default),
        };

        cell.lock().insert(member);
    }

    /// Copies all metric state into a fresh [`Snapshot`] and resets the live maps.
    ///
    /// Counters reset to zero, timers and sets empty out, gauges keep their value. Keys other
    /// than the meta-counters are removed instead where the config enables deletion; gauges are
    /// only removed if they saw no write since the previous flush.
    ///
    /// The caller must hold the exclusive side of the flush gate: with all ingestion paused,
    /// plain atomic loads and stores observe and replace every completed write.
    pub fn snapshot_and_reset(&self, config: &CollectorConfig) -> Snapshot {
        let mut snapshot = Snapshot::default();
        let mut removed = Vec::new();

        let counters = self.counters.pin();
        for (key, value) in counters.iter() {
            snapshot
                .counters
                .insert(key.clone(), value.load(Ordering::Relaxed));

            if config.delete_counters() && !is_protected_counter(key) {
                removed.push(key.clone());
            } else {
                value.store(0, Ordering::Relaxed);
            }
        }
        for key in removed.drain(..) {
            counters.remove(&key);
        }

        let gauges = self.gauges.pin();
        for (key, cell) in gauges.iter() {
            snapshot
                .gauges
                .insert(key.clone(), cell.value.load(Ordering::Relaxed));

            let dirty = cell.dirty.swap(false, Ordering::Relaxed);
            if config.delete_gauges() && !dirty {
                removed.push(key.clone());
            }
        }
        for key in removed.drain(..) {
            gauges.remove(&key);
        }

        let timers = self.timers.pin();
        for (key, cell) in timers.iter() {
            let mut reservoir = cell.lock();
            snapshot
                .timers
                .insert(key.clone(), std::mem::take(&mut reservoir.samples));
            snapshot.timer_counts.insert(key.clone(), reservoir.count);
            reservoir.count = 0;

            if config.delete_timers() {
                removed.push(key.clone());
            }
        }
        for key in removed.drain(..) {
            timers.remove(&key);
        }

        let sets = self.sets.pin();
        for (key, cell) in sets.iter() {
            snapshot
                .sets
                .insert(key.clone(), std::mem::take(&mut *cell.lock()));

            if config.delete_sets() {
                removed.push(key.clone());
            }
        }
        for key in removed.drain(..) {
            sets.remove(&key);
        }

        snapshot
    }
}
