//! Rate limiter coordination logic.
//!
//! The rate limiter decides whether an error report should be admitted or
//! dropped, based on its fingerprint's counter and the window policy.

use crate::application::metrics::Metrics;
use crate::application::ports::{EntryStatus, Storage};
use crate::application::registry::FingerprintRegistry;
use crate::domain::{
    event::ErrorEvent,
    fingerprint::Fingerprint,
    policy::{ReportDecision, WindowPolicy},
    stats::{ErrorStats, TrackerStats},
    window::{CounterEntry, WindowOutcome},
};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Coordinates admit/drop decisions.
#[derive(Clone)]
pub struct RateLimiter<S>
where
    S: Storage<Fingerprint, CounterEntry> + Clone,
{
    registry: FingerprintRegistry<S>,
    policy: WindowPolicy,
    metrics: Metrics,
    inline_sweep: Option<InlineSweep>,
}

/// Sweep schedule driven by `check` calls.
#[derive(Debug, Clone)]
struct InlineSweep {
    interval: Duration,
    last_sweep: Arc<Mutex<Instant>>,
}

impl<S> RateLimiter<S>
where
    S: Storage<Fingerprint, CounterEntry> + Clone,
{
    /// Create a new rate limiter.
    ///
    /// # Arguments
    /// * `registry` - The fingerprint registry (which contains the clock)
    /// * `policy` - Admit cap and window length
    /// * `metrics` - Metrics tracker
    pub fn new(registry: FingerprintRegistry<S>, policy: WindowPolicy, metrics: Metrics) -> Self {
        Self {
            registry,
            policy,
            metrics,
            inline_sweep: None,
        }
    }

    /// Decide whether to admit a report with the given fingerprint.
    ///
    /// The lookup and the counter update happen under the storage's per-key
    /// lock, so concurrent callers never double-admit past the cap.
    pub fn check(&self, fingerprint: Fingerprint) -> ReportDecision {
        let outcome = self
            .registry
            .with_entry(fingerprint, |entry, status, now| match status {
                EntryStatus::Created => None,
                EntryStatus::Existing => Some((entry.register(now, &self.policy), entry.count())),
            });

        let decision = match outcome {
            None => {
                trace!(fingerprint = %fingerprint, "first sighting, report admitted");
                ReportDecision::Admit
            }
            Some((outcome, count)) => {
                match outcome {
                    WindowOutcome::Counted => {
                        trace!(fingerprint = %fingerprint, count, "report admitted");
                    }
                    WindowOutcome::Reset => {
                        self.metrics.record_window_reset();
                        debug!(fingerprint = %fingerprint, "window expired, counter reset");
                    }
                    WindowOutcome::Capped => {
                        debug!(fingerprint = %fingerprint, count, "report cap reached, dropping duplicate");
                    }
                }
                outcome.decision()
            }
        };

        match decision {
            ReportDecision::Admit => self.metrics.record_admitted(),
            ReportDecision::Drop => self.metrics.record_dropped(),
        }

        self.sweep_if_due();
        decision
    }

    /// Also sweep from `check` whenever `interval` has passed since the last
    /// inline sweep.
    ///
    /// Used when no background task is available to bound memory.
    pub fn with_inline_sweep(mut self, interval: Duration) -> Self {
        self.inline_sweep = Some(InlineSweep {
            interval,
            last_sweep: Arc::new(Mutex::new(self.registry.now())),
        });
        self
    }

    /// Whether `check` sweeps on its own schedule.
    pub fn sweeps_inline(&self) -> bool {
        self.inline_sweep.is_some()
    }

    fn sweep_if_due(&self) {
        let Some(inline) = &self.inline_sweep else {
            return;
        };
        let now = self.registry.now();

        // Another caller holding the lock is already sweeping
        let mut last_sweep = match inline.last_sweep.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        if now.saturating_duration_since(*last_sweep) < inline.interval {
            return;
        }
        *last_sweep = now;
        drop(last_sweep);

        let evicted = self.sweep();
        debug!(
            evicted,
            remaining = self.registry.len(),
            "inline sweep of stale error fingerprints"
        );
    }

    /// Fingerprint an event and decide whether to admit it.
    pub fn check_event(&self, event: &ErrorEvent) -> ReportDecision {
        self.check(Fingerprint::of(event))
    }

    /// Evict fingerprints inactive for longer than one window.
    ///
    /// Returns the number of evicted fingerprints.
    pub fn sweep(&self) -> usize {
        let evicted = self.registry.evict_stale(self.policy.window());
        self.metrics.record_evictions(evicted);
        evicted
    }

    /// Snapshot of all tracked fingerprints. Does not modify any state.
    pub fn stats(&self) -> TrackerStats {
        let mut errors = Vec::with_capacity(self.registry.len());
        self.registry.for_each(|fingerprint, entry| {
            errors.push(ErrorStats::from_entry(*fingerprint, entry));
        });
        TrackerStats::from_errors(errors)
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &FingerprintRegistry<S> {
        &self.registry
    }

    /// Get the window policy.
    pub fn policy(&self) -> &WindowPolicy {
        &self.policy
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
