//! Ports (interfaces) for the application layer.
//!
//! The application layer only talks to time and storage through these
//! traits. Infrastructure adapters implement them.

use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

/// Port for obtaining current time.
///
/// Infrastructure provides `SystemClock` for production and `MockClock`
/// for tests that need to move time by hand.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// Whether an entry existed before it was accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// The entry was just created by the factory
    Created,
    /// The entry was already present
    Existing,
}

/// Port for concurrent key-value storage.
///
/// Implementations must run `with_entry_mut` atomically per key: no other
/// caller may observe or modify the entry between the factory and the end
/// of the accessor.
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry mutably, creating it with `factory` if absent.
    ///
    /// The accessor is told whether the entry was created by this call.
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V, EntryStatus) -> R;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Iterate over all entries.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&K, &V);

    /// Remove entries for which the predicate returns false.
    ///
    /// Returns the number of removed entries.
    fn retain<F>(&self, f: F) -> usize
    where
        F: FnMut(&K, &mut V) -> bool;
}
