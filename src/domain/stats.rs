//! Read-only snapshots of tracked fingerprints.

use crate::domain::fingerprint::Fingerprint;
use crate::domain::window::CounterEntry;
use std::time::{Duration, Instant};

/// Snapshot of one tracked fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorStats {
    /// Fingerprint of the error class
    pub fingerprint: Fingerprint,
    /// Reports counted in the current window
    pub count: usize,
    /// Start of the current window
    pub first_seen: Instant,
    /// Most recent occurrence
    pub last_seen: Instant,
}

impl ErrorStats {
    /// Create a snapshot from a counter entry.
    pub fn from_entry(fingerprint: Fingerprint, entry: &CounterEntry) -> Self {
        Self {
            fingerprint,
            count: entry.count(),
            first_seen: entry.first_seen(),
            last_seen: entry.last_seen(),
        }
    }

    /// Time between the first and the most recent occurrence in this window.
    pub fn active_for(&self) -> Duration {
        self.last_seen.saturating_duration_since(self.first_seen)
    }
}

/// Snapshot of everything the throttle is tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Number of tracked fingerprints
    pub tracked_errors: usize,
    /// Per-fingerprint details, in no particular order
    pub errors: Vec<ErrorStats>,
}

impl TrackerStats {
    /// Build a snapshot from collected entries.
    pub fn from_errors(errors: Vec<ErrorStats>) -> Self {
        Self {
            tracked_errors: errors.len(),
            errors,
        }
    }

    /// Look up the snapshot of a single fingerprint.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&ErrorStats> {
        self.errors.iter().find(|e| &e.fingerprint == fingerprint)
    }
}
