//! # report-throttle
//!
//! Fingerprint-based rate limiting for error reports.
//!
//! An application that forwards every error to an error-tracking service can
//! flood it with thousands of copies of the same failure. This crate decides,
//! per report, whether it should be sent or suppressed as a duplicate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use report_throttle::{ErrorEvent, Exception, ReportThrottle};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // Defaults: 5 reports per error per hour, stale errors swept every 15 minutes
//! let throttle = ReportThrottle::new();
//!
//! // Or customize:
//! let throttle = ReportThrottle::builder()
//!     .with_max_reports_per_window(10)
//!     .with_window(Duration::from_secs(30 * 60))
//!     .with_cleanup_interval(Duration::from_secs(5 * 60))
//!     .build()
//!     .unwrap();
//!
//! let event = ErrorEvent::new()
//!     .with_exception(Exception::new("TypeError", "x is undefined").with_frame("app.js", 42));
//!
//! if throttle.should_report(&event) {
//!     // hand the event to the error-tracking client
//! }
//!
//! // On shutdown
//! throttle.destroy();
//! # }
//! ```
//!
//! ## Fingerprints
//!
//! Reports are grouped by a [`Fingerprint`]: the SHA-256 digest of
//! - the first exception's type (`"Error"` if absent)
//! - the event message, else the first exception's value (`"unknown"` if neither)
//! - the last 3 stack frames of the first exception, as `file:line`
//!
//! Two reports of the same error thrown from the same place collapse to one
//! fingerprint. The same error thrown from a different line does not.
//!
//! ## Windows
//!
//! Each fingerprint may be admitted `max_reports_per_window` times within a
//! window that opens at its first sighting. Later reports are dropped until
//! the window has fully elapsed, at which point the counter starts over.
//! Admits do not extend the window.
//!
//! ```rust
//! use report_throttle::{ErrorEvent, Exception, ReportThrottle};
//!
//! let throttle = ReportThrottle::builder()
//!     .with_max_reports_per_window(2)
//!     .with_background_sweep(false)
//!     .build()
//!     .unwrap();
//!
//! let event = ErrorEvent::new().with_exception(Exception::new("TypeError", "x is undefined"));
//! assert!(throttle.should_report(&event));
//! assert!(throttle.should_report(&event));
//! assert!(!throttle.should_report(&event));
//! ```
//!
//! ## Pre-send Hooks
//!
//! Error-tracking clients usually accept a hook that returns the event to
//! send it or nothing to drop it. [`ReportThrottle::before_send`] builds one:
//!
//! ```rust
//! use report_throttle::{ErrorEvent, ReportThrottle};
//!
//! let throttle = ReportThrottle::builder()
//!     .with_background_sweep(false)
//!     .build()
//!     .unwrap();
//! let hook = throttle.before_send::<ErrorEvent>();
//!
//! let event = ErrorEvent::new().with_message("disk full");
//! assert_eq!(hook(event.clone()), Some(event));
//! ```
//!
//! ## Memory
//!
//! State lives in memory only. Fingerprints that have not been seen for
//! longer than one window are evicted every cleanup interval: by a
//! background task when the `async` feature is on and a tokio runtime is
//! available, otherwise by `should_report` itself once the interval has
//! passed. [`ReportThrottle::sweep`] evicts on demand.
//!
//! ## Observability
//!
//! ```rust
//! # use report_throttle::ReportThrottle;
//! # let throttle = ReportThrottle::builder().with_background_sweep(false).build().unwrap();
//! let stats = throttle.stats();
//! println!("tracking {} distinct errors", stats.tracked_errors);
//!
//! let metrics = throttle.metrics().snapshot();
//! println!("drop rate: {:.2}%", metrics.drop_rate() * 100.0);
//! ```

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - adapters and façade
pub mod infrastructure;

pub use domain::{
    event::{ErrorEvent, Exception, ExceptionList, Frame, Stacktrace},
    fingerprint::{
        fingerprint, Fingerprint, DEFAULT_ERROR_TYPE, STACK_FRAME_DEPTH, UNKNOWN_FILENAME,
        UNKNOWN_LINENO, UNKNOWN_MESSAGE,
    },
    policy::{PolicyError, ReportDecision, WindowPolicy},
    stats::{ErrorStats, TrackerStats},
    window::{CounterEntry, WindowOutcome},
};

pub use application::{
    limiter::RateLimiter,
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, EntryStatus, Storage},
    registry::FingerprintRegistry,
    sweeper::{Sweeper, SweeperConfig, SweeperConfigError},
};

#[cfg(feature = "async")]
pub use application::sweeper::{ShutdownError, SweeperHandle};

pub use infrastructure::{
    clock::SystemClock,
    config::{InvalidDuration, ThrottleConfig},
    storage::ShardedStorage,
    throttle::{BuildError, DefaultStorage, ReportThrottle, ReportThrottleBuilder},
};
