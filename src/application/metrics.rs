//! Observability metrics for report throttling.
//!
//! Counters are never consulted when deciding; they only describe what the
//! throttle has done.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking throttling statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Clones share the same counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Reports forwarded to the error-tracking service
    reports_admitted: AtomicU64,
    /// Reports suppressed as duplicates
    reports_dropped: AtomicU64,
    /// Admits that started a fresh window for an expired fingerprint
    windows_reset: AtomicU64,
    /// Fingerprints removed by the sweeper
    entries_evicted: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.reports_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.inner.reports_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_window_reset(&self) {
        self.inner.windows_reset.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: usize) {
        self.inner
            .entries_evicted
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Get the total number of admitted reports.
    pub fn reports_admitted(&self) -> u64 {
        self.inner.reports_admitted.load(Ordering::Relaxed)
    }

    /// Get the total number of dropped reports.
    pub fn reports_dropped(&self) -> u64 {
        self.inner.reports_dropped.load(Ordering::Relaxed)
    }

    /// Get the number of window resets.
    pub fn windows_reset(&self) -> u64 {
        self.inner.windows_reset.load(Ordering::Relaxed)
    }

    /// Get the total number of evicted fingerprints.
    pub fn entries_evicted(&self) -> u64 {
        self.inner.entries_evicted.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reports_admitted: self.reports_admitted(),
            reports_dropped: self.reports_dropped(),
            windows_reset: self.windows_reset(),
            entries_evicted: self.entries_evicted(),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.inner.reports_admitted.store(0, Ordering::Relaxed);
        self.inner.reports_dropped.store(0, Ordering::Relaxed);
        self.inner.windows_reset.store(0, Ordering::Relaxed);
        self.inner.entries_evicted.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub reports_admitted: u64,
    pub reports_dropped: u64,
    pub windows_reset: u64,
    pub entries_evicted: u64,
}

impl MetricsSnapshot {
    /// Fraction of reports that were dropped (0.0 to 1.0).
    ///
    /// Returns 0.0 if no reports have been processed.
    pub fn drop_rate(&self) -> f64 {
        let total = self.total_reports();
        if total == 0 {
            0.0
        } else {
            self.reports_dropped as f64 / total as f64
        }
    }

    /// Total number of reports processed (admitted + dropped).
    pub fn total_reports(&self) -> u64 {
        self.reports_admitted.saturating_add(self.reports_dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_state() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.total_reports(), 0);
        assert_eq!(snapshot.windows_reset, 0);
        assert_eq!(snapshot.entries_evicted, 0);
    }

    #[test]
    fn test_record_and_read() {
        let metrics = Metrics::new();
        metrics.record_admitted();
        metrics.record_admitted();
        metrics.record_dropped();
        metrics.record_window_reset();
        metrics.record_evictions(4);

        assert_eq!(metrics.reports_admitted(), 2);
        assert_eq!(metrics.reports_dropped(), 1);
        assert_eq!(metrics.windows_reset(), 1);
        assert_eq!(metrics.entries_evicted(), 4);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = Metrics::new();
        let clone = metrics.clone();
        clone.record_dropped();
        assert_eq!(metrics.reports_dropped(), 1);
    }

    #[test]
    fn test_drop_rate() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().drop_rate(), 0.0);

        metrics.record_admitted();
        metrics.record_dropped();
        metrics.record_dropped();
        metrics.record_dropped();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_reports(), 4);
        assert!((snapshot.drop_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_admitted();
        metrics.record_evictions(2);
        metrics.reset();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                reports_admitted: 0,
                reports_dropped: 0,
                windows_reset: 0,
                entries_evicted: 0,
            }
        );
    }
}
