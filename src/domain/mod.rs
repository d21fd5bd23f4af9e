//! Domain layer - pure business logic with no runtime dependencies.
//!
//! This layer contains the core concepts and invariants of the throttle:
//! - Error event model
//! - Fingerprint computation
//! - Window policy and per-fingerprint counters
//! - Statistics snapshots
//!
//! All types in this layer are pure and easily testable.

pub mod event;
pub mod fingerprint;
pub mod policy;
pub mod stats;
pub mod window;
