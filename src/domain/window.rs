//! Per-fingerprint occurrence counters.
//!
//! Each tracked fingerprint owns one `CounterEntry`. The window is anchored
//! at `first_seen`: later admits do not extend it, and once it has fully
//! elapsed the next report starts a fresh window.

use crate::domain::policy::{ReportDecision, WindowPolicy};
use std::time::{Duration, Instant};

/// What registering a report did to its counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    /// Admitted within the current window
    Counted,
    /// The previous window had expired; counter restarted at 1 and admitted
    Reset,
    /// The cap was reached; only `last_seen` moved
    Capped,
}

impl WindowOutcome {
    /// The admission decision for this outcome.
    pub fn decision(&self) -> ReportDecision {
        match self {
            WindowOutcome::Counted | WindowOutcome::Reset => ReportDecision::Admit,
            WindowOutcome::Capped => ReportDecision::Drop,
        }
    }
}

/// Occurrence counter for one fingerprint.
///
/// Invariants: `count >= 1` and `first_seen <= last_seen`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterEntry {
    count: usize,
    first_seen: Instant,
    last_seen: Instant,
}

impl CounterEntry {
    /// Create the entry for a first sighting.
    pub fn new(now: Instant) -> Self {
        Self {
            count: 1,
            first_seen: now,
            last_seen: now,
        }
    }

    /// Register another occurrence of an already tracked fingerprint.
    ///
    /// Drops never increment `count` past the cap but still move `last_seen`,
    /// which keeps a noisy fingerprint from being swept while it is active.
    pub fn register(&mut self, now: Instant, policy: &WindowPolicy) -> WindowOutcome {
        if self.window_expired(now, policy.window()) {
            *self = Self::new(now);
            return WindowOutcome::Reset;
        }

        self.last_seen = self.last_seen.max(now);

        if self.count >= policy.max_reports_per_window() {
            WindowOutcome::Capped
        } else {
            self.count += 1;
            WindowOutcome::Counted
        }
    }

    /// Whether the window opened at `first_seen` has fully elapsed.
    pub fn window_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.first_seen) > window
    }

    /// Whether the fingerprint has been inactive for longer than `window`.
    pub fn is_stale(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > window
    }

    /// Reports counted in the current window.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Start of the current window.
    pub fn first_seen(&self) -> Instant {
        self.first_seen
    }

    /// Most recent occurrence, admitted or dropped.
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max: usize) -> WindowPolicy {
        WindowPolicy::new(max, Duration::from_secs(3600)).unwrap()
    }

    #[test]
    fn test_new_entry() {
        let now = Instant::now();
        let entry = CounterEntry::new(now);

        assert_eq!(entry.count(), 1);
        assert_eq!(entry.first_seen(), now);
        assert_eq!(entry.last_seen(), now);
    }

    #[test]
    fn test_counts_up_to_cap() {
        let now = Instant::now();
        let policy = policy(3);
        let mut entry = CounterEntry::new(now);

        assert_eq!(entry.register(now, &policy), WindowOutcome::Counted);
        assert_eq!(entry.register(now, &policy), WindowOutcome::Counted);
        assert_eq!(entry.count(), 3);

        assert_eq!(entry.register(now, &policy), WindowOutcome::Capped);
        assert_eq!(entry.register(now, &policy), WindowOutcome::Capped);
        assert_eq!(entry.count(), 3);
    }

    #[test]
    fn test_capped_report_moves_last_seen() {
        let start = Instant::now();
        let policy = policy(1);
        let mut entry = CounterEntry::new(start);

        let later = start + Duration::from_secs(600);
        assert_eq!(entry.register(later, &policy), WindowOutcome::Capped);
        assert_eq!(entry.count(), 1);
        assert_eq!(entry.first_seen(), start);
        assert_eq!(entry.last_seen(), later);
    }

    #[test]
    fn test_window_anchored_at_first_seen() {
        let start = Instant::now();
        let policy = policy(2);
        let mut entry = CounterEntry::new(start);

        // Admit late in the window does not extend it
        let near_end = start + Duration::from_secs(3500);
        assert_eq!(entry.register(near_end, &policy), WindowOutcome::Counted);

        let past_end = start + Duration::from_secs(3601);
        assert_eq!(entry.register(past_end, &policy), WindowOutcome::Reset);
        assert_eq!(entry.count(), 1);
        assert_eq!(entry.first_seen(), past_end);
        assert_eq!(entry.last_seen(), past_end);
    }

    #[test]
    fn test_exact_window_boundary_does_not_reset() {
        let start = Instant::now();
        let policy = policy(1);
        let mut entry = CounterEntry::new(start);

        let boundary = start + Duration::from_secs(3600);
        assert_eq!(entry.register(boundary, &policy), WindowOutcome::Capped);
    }

    #[test]
    fn test_staleness() {
        let start = Instant::now();
        let window = Duration::from_secs(60);
        let entry = CounterEntry::new(start);

        assert!(!entry.is_stale(start + Duration::from_secs(60), window));
        assert!(entry.is_stale(start + Duration::from_secs(61), window));
    }

    #[test]
    fn test_outcome_decisions() {
        assert_eq!(WindowOutcome::Counted.decision(), ReportDecision::Admit);
        assert_eq!(WindowOutcome::Reset.decision(), ReportDecision::Admit);
        assert_eq!(WindowOutcome::Capped.decision(), ReportDecision::Drop);
    }
}
