use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free tally of reliability-layer events, sampled by the metrics
/// module without touching the per-peer state it describes.
#[derive(Debug, Default)]
pub struct Counters {
    reliable_retries: AtomicU64,
    reliable_timeouts: AtomicU64,
    dropped_duplicates: AtomicU64,
    dropped_old: AtomicU64,
    dropped_window: AtomicU64,
}

/// A point-in-time copy of [`Counters`], safe to hand to the metrics module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub reliable_retries: u64,
    pub reliable_timeouts: u64,
    pub dropped_duplicates: u64,
    pub dropped_old: u64,
    pub dropped_window: u64,
}

impl Counters {
    pub fn record_retry(&self) {
        self.reliable_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.reliable_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.dropped_duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_old(&self) {
        self.dropped_old.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_overflow(&self) {
        self.dropped_window.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            reliable_retries: self.reliable_retries.load(Ordering::Relaxed),
            reliable_timeouts: self.reliable_timeouts.load(Ordering::Relaxed),
            dropped_duplicates: self.dropped_duplicates.load(Ordering::Relaxed),
            dropped_old: self.dropped_old.load(Ordering::Relaxed),
            dropped_window: self.dropped_window.load(Ordering::Relaxed),
        }
    }
}
