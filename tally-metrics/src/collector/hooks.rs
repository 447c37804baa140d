use std::sync::Arc;

use parking_lot::Mutex;

use super::Collector;
use crate::snapshot::Snapshot;
use tally_common::UnixTimestamp;

/// An error raised by a flush subscriber.
///
/// The engine does not interpret subscriber errors; they are forwarded verbatim to the
/// registered error subscribers.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub(super) type BeforeFlushFn = Arc<dyn Fn(&Collector) + Send + Sync>;
pub(super) type OnFlushFn =
    Arc<dyn Fn(UnixTimestamp, &Snapshot) -> Result<(), HookError> + Send + Sync>;
pub(super) type OnFlushErrorFn = Arc<dyn Fn(&HookError) + Send + Sync>;

/// Registered flush callbacks, in registration order.
///
/// Invocation works on a clone of the registered list so that slow subscribers never hold the
/// registry lock.
#[derive(Default)]
pub(super) struct Hooks {
    before_flush: Mutex<Vec<BeforeFlushFn>>,
    on_flush: Mutex<Vec<OnFlushFn>>,
    on_flush_error: Mutex<Vec<OnFlushErrorFn>>,
}

impl Hooks {
    pub fn register_before_flush(&self, hook: BeforeFlushFn) {
        self.before_flush.lock().push(hook);
    }

    pub fn register_on_flush(&self, hook: OnFlushFn) {
        self.on_flush.lock().push(hook);
    }

    pub fn register_on_flush_error(&self, hook: OnFlushErrorFn) {
        self.on_flush_error.lock().push(hook);
    }

    pub fn before_flush_hooks(&self) -> Vec<BeforeFlushFn> {
        self.before_flush.lock().clone()
    }

    pub fn on_flush_hooks(&self) -> Vec<OnFlushFn> {
        self.on_flush.lock().clone()
    }

    pub fn on_flush_error_hooks(&self) -> Vec<OnFlushErrorFn> {
        self.on_flush_error.lock().clone()
    }
}
