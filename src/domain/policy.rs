//! Window policy for error report admission.
//!
//! A policy caps how many reports of one fingerprint are admitted within a
//! fixed window that starts at the fingerprint's first sighting.

use std::fmt;
use std::time::Duration;

/// Default admit cap per window per fingerprint.
pub const DEFAULT_MAX_REPORTS_PER_WINDOW: usize = 5;

/// Default window length (one hour).
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Decision about how to handle an error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportDecision {
    /// Forward the report to the error-tracking service
    Admit,
    /// Suppress the report as a duplicate
    Drop,
}

impl ReportDecision {
    /// Check if this decision admits the report.
    pub fn is_admit(&self) -> bool {
        matches!(self, ReportDecision::Admit)
    }

    /// Check if this decision drops the report.
    pub fn is_drop(&self) -> bool {
        matches!(self, ReportDecision::Drop)
    }
}

/// Error returned when a window policy is out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    /// The admit cap must be at least 1
    ZeroMaxReports,
    /// The window must be longer than zero
    ZeroWindow,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::ZeroMaxReports => {
                write!(f, "max_reports_per_window must be greater than 0")
            }
            PolicyError::ZeroWindow => write!(f, "window duration must be greater than 0"),
        }
    }
}

impl std::error::Error for PolicyError {}

/// Fixed-window admission policy.
///
/// # Example
/// ```
/// use report_throttle::WindowPolicy;
/// use std::time::Duration;
///
/// let policy = WindowPolicy::new(2, Duration::from_secs(3600)).unwrap();
/// assert_eq!(policy.max_reports_per_window(), 2);
/// assert!(WindowPolicy::new(0, Duration::from_secs(3600)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    max_reports_per_window: usize,
    window: Duration,
}

impl WindowPolicy {
    /// Create a new window policy.
    ///
    /// # Errors
    /// Returns `PolicyError::ZeroMaxReports` if `max_reports_per_window` is 0,
    /// or `PolicyError::ZeroWindow` if `window` is zero.
    pub fn new(max_reports_per_window: usize, window: Duration) -> Result<Self, PolicyError> {
        if max_reports_per_window == 0 {
            return Err(PolicyError::ZeroMaxReports);
        }
        if window.is_zero() {
            return Err(PolicyError::ZeroWindow);
        }
        Ok(Self {
            max_reports_per_window,
            window,
        })
    }

    /// Maximum number of admitted reports per window.
    pub fn max_reports_per_window(&self) -> usize {
        self.max_reports_per_window
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            max_reports_per_window: DEFAULT_MAX_REPORTS_PER_WINDOW,
            window: DEFAULT_WINDOW,
        }
    }
}
