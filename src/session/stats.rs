//! Session counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by both workers.
#[derive(Debug, Default)]
pub struct SessionStats {
    frames_written: AtomicU64,
    frames_dropped: AtomicU64,
    frames_failed: AtomicU64,
    pairs_opened: AtomicU64,
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames written to a pair
    pub frames_written: u64,
    /// Frames discarded because no pair was open
    pub frames_dropped: u64,
    /// Frames skipped after a processing or write error
    pub frames_failed: u64,
    /// Pairs opened, including the first one
    pub pairs_opened: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_written(&self) {
        self.frames_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.frames_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pair_opened(&self) {
        self.pairs_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_written: self.frames_written.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_failed: self.frames_failed.load(Ordering::Relaxed),
            pairs_opened: self.pairs_opened.load(Ordering::Relaxed),
        }
    }
}
