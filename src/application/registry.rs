//! Central registry of tracked fingerprints.
//!
//! The registry pairs the counter storage with the clock, so every access
//! sees a single consistent `now`.

use crate::application::ports::{Clock, EntryStatus, Storage};
use crate::domain::{fingerprint::Fingerprint, window::CounterEntry};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Registry managing all per-fingerprint counters.
///
/// Generic over the storage implementation. In production, use
/// `Arc<ShardedStorage>` so clones share one map.
#[derive(Clone)]
pub struct FingerprintRegistry<S>
where
    S: Storage<Fingerprint, CounterEntry> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S> FingerprintRegistry<S>
where
    S: Storage<Fingerprint, CounterEntry> + Clone,
{
    /// Create a new registry with storage and a clock.
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Access or create the counter for a fingerprint.
    ///
    /// A first sighting creates `CounterEntry::new(now)`. The callback gets
    /// the entry, whether it was just created, and the current timestamp.
    pub fn with_entry<F, R>(&self, fingerprint: Fingerprint, f: F) -> R
    where
        F: FnOnce(&mut CounterEntry, EntryStatus, Instant) -> R,
    {
        let now = self.clock.now();
        self.storage.with_entry_mut(
            fingerprint,
            || CounterEntry::new(now),
            |entry, status| f(entry, status, now),
        )
    }

    /// Remove every entry inactive for longer than `window`.
    ///
    /// Returns the number of removed entries.
    pub fn evict_stale(&self, window: Duration) -> usize {
        let now = self.clock.now();
        self.storage
            .retain(|_fingerprint, entry| !entry.is_stale(now, window))
    }

    /// Get the number of tracked fingerprints.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Clear all tracked state.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Iterate over all tracked counters.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&Fingerprint, &CounterEntry),
    {
        self.storage.for_each(f);
    }

    /// Current time according to the registry's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }
}
