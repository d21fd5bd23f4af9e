//! Infrastructure layer - adapters and the public façade.
//!
//! This layer provides:
//! - Clock abstraction (system time vs mock)
//! - Storage implementation (sharded concurrent map)
//! - Serializable configuration
//! - `ReportThrottle`, which wires everything together

pub mod clock;
pub mod config;
pub mod storage;
pub mod throttle;

/// Mock implementations for testing.
///
/// Only available with the `test-helpers` feature or in test builds:
///
/// ```toml
/// [dev-dependencies]
/// report-throttle = { version = "*", features = ["test-helpers"] }
/// ```
#[cfg(any(test, feature = "test-helpers"))]
pub mod mocks;
