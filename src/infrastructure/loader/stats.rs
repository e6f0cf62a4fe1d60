//! Per-loader counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters describing what a loader did during its scope
#[derive(Debug, Default)]
pub struct LoaderStats {
    batches: AtomicU64,
    keys_fetched: AtomicU64,
    cache_hits: AtomicU64,
    primed: AtomicU64,
    batch_failures: AtomicU64,
}

/// Point-in-time copy of [`LoaderStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStatsSnapshot {
    pub batches: u64,
    pub keys_fetched: u64,
    pub cache_hits: u64,
    pub primed: u64,
    pub batch_failures: u64,
}

impl LoaderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&self, size: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.keys_fetched.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_primed(&self, count: usize) {
        self.primed.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_batch_failure(&self) {
        self.batch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LoaderStatsSnapshot {
        LoaderStatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            keys_fetched: self.keys_fetched.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            primed: self.primed.load(Ordering::Relaxed),
            batch_failures: self.batch_failures.load(Ordering::Relaxed),
        }
    }
}
