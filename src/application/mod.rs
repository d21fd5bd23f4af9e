//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages runtime behavior:
//! - Fingerprint registry (storage of counters)
//! - Rate limiter (admit/drop decisions)
//! - Sweeper (periodic eviction of stale fingerprints)
//! - Metrics
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement, keeping it independent of concrete clocks
//! and maps.

pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod sweeper;
