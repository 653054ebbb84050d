//! Dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the dispatch loop and handler tasks.
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Events accepted by `push`.
    pub pushed: AtomicU64,
    /// Events taken off the queue.
    pub dispatched: AtomicU64,
    /// Dequeued events with no registered handler.
    pub discarded: AtomicU64,
    /// Handler tasks spawned.
    pub handlers_launched: AtomicU64,
    pub handlers_succeeded: AtomicU64,
    /// Handler tasks that returned an error.
    pub handlers_failed: AtomicU64,
    /// Handler tasks that panicked.
    pub handlers_panicked: AtomicU64,
    /// Failures inside the loop itself.
    pub loop_errors: AtomicU64,
}

impl EngineStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pushed: self.pushed.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            handlers_launched: self.handlers_launched.load(Ordering::Relaxed),
            handlers_succeeded: self.handlers_succeeded.load(Ordering::Relaxed),
            handlers_failed: self.handlers_failed.load(Ordering::Relaxed),
            handlers_panicked: self.handlers_panicked.load(Ordering::Relaxed),
            loop_errors: self.loop_errors.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters.
    #[cfg(test)]
    pub(crate) fn reset(&self) {
        for counter in [
            &self.pushed,
            &self.dispatched,
            &self.discarded,
            &self.handlers_launched,
            &self.handlers_succeeded,
            &self.handlers_failed,
            &self.handlers_panicked,
            &self.loop_errors,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Copy of [`EngineStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub pushed: u64,
    pub dispatched: u64,
    pub discarded: u64,
    pub handlers_launched: u64,
    pub handlers_succeeded: u64,
    pub handlers_failed: u64,
    pub handlers_panicked: u64,
    pub loop_errors: u64,
}

impl StatsSnapshot {
    /// Handler tasks that have finished, whatever the outcome.
    pub fn handlers_completed(&self) -> u64 {
        self.handlers_succeeded + self.handlers_failed + self.handlers_panicked
    }
}
