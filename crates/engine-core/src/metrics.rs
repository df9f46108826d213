use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    polls: AtomicU64,
    empty_polls: AtomicU64,
    failed_polls: AtomicU64,
    reconnects: AtomicU64,
    batches: AtomicU64,
    rows: AtomicU64,
    dropped_rows: AtomicU64,
}

/// Shared poll counters. Clones observe the same values.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub polls: u64,
    pub empty_polls: u64,
    pub failed_polls: u64,
    pub reconnects: u64,
    pub batches: u64,
    pub rows: u64,
    pub dropped_rows: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn increment_polls(&self) {
        self.inner.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_empty_polls(&self) {
        self.inner.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed_polls(&self) {
        self.inner.failed_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reconnects(&self) {
        self.inner.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches(&self, count: u64) {
        self.inner.batches.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_rows(&self, count: u64) {
        self.inner.rows.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_dropped(&self, count: u64) {
        self.inner.dropped_rows.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polls: self.inner.polls.load(Ordering::Relaxed),
            empty_polls: self.inner.empty_polls.load(Ordering::Relaxed),
            failed_polls: self.inner.failed_polls.load(Ordering::Relaxed),
            reconnects: self.inner.reconnects.load(Ordering::Relaxed),
            batches: self.inner.batches.load(Ordering::Relaxed),
            rows: self.inner.rows.load(Ordering::Relaxed),
            dropped_rows: self.inner.dropped_rows.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let clone = metrics.clone();
        metrics.increment_polls();
        clone.increment_polls();
        clone.increment_rows(25);
        clone.increment_dropped(2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.polls, 2);
        assert_eq!(snapshot.rows, 25);
        assert_eq!(snapshot.dropped_rows, 2);
        assert_eq!(snapshot.failed_polls, 0);
    }
}
