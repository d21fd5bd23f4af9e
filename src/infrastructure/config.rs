//! Serializable throttle options.
//!
//! Accepts both snake_case and camelCase keys, so options can come from a
//! Rust config file or from a JavaScript-style client config. Unknown keys
//! are ignored and missing keys take their defaults.

use crate::application::sweeper::DEFAULT_CLEANUP_INTERVAL;
use crate::domain::policy::{DEFAULT_MAX_REPORTS_PER_WINDOW, DEFAULT_WINDOW};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Throttle options as plain numbers.
///
/// # Example
/// ```
/// use report_throttle::ThrottleConfig;
///
/// let config: ThrottleConfig = serde_json::from_str(r#"{ "maxReportsPerWindow": 2 }"#).unwrap();
/// assert_eq!(config.max_reports_per_window, 2);
/// assert_eq!(config.window_hours, 1.0);
/// assert_eq!(config.cleanup_interval_minutes, 15.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Admit cap per window per fingerprint
    #[serde(alias = "maxReportsPerWindow")]
    pub max_reports_per_window: usize,
    /// Window length in hours
    #[serde(alias = "windowHours")]
    pub window_hours: f64,
    /// Sweep period in minutes
    #[serde(alias = "cleanupIntervalMinutes")]
    pub cleanup_interval_minutes: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_reports_per_window: DEFAULT_MAX_REPORTS_PER_WINDOW,
            window_hours: DEFAULT_WINDOW.as_secs_f64() / 3600.0,
            cleanup_interval_minutes: DEFAULT_CLEANUP_INTERVAL.as_secs_f64() / 60.0,
        }
    }
}

/// Error returned when a configured number cannot be turned into a duration.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidDuration {
    /// Name of the offending option
    pub option: &'static str,
    /// The rejected value
    pub value: f64,
}

impl std::fmt::Display for InvalidDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not a valid duration: {}", self.option, self.value)
    }
}

impl std::error::Error for InvalidDuration {}

impl ThrottleConfig {
    /// Window length as a `Duration`.
    ///
    /// # Errors
    /// Returns `InvalidDuration` for negative, NaN or overflowing values.
    pub fn window(&self) -> Result<Duration, InvalidDuration> {
        to_duration("window_hours", self.window_hours, 3600.0)
    }

    /// Sweep period as a `Duration`.
    ///
    /// # Errors
    /// Returns `InvalidDuration` for negative, NaN or overflowing values.
    pub fn cleanup_interval(&self) -> Result<Duration, InvalidDuration> {
        to_duration(
            "cleanup_interval_minutes",
            self.cleanup_interval_minutes,
            60.0,
        )
    }
}

fn to_duration(option: &'static str, value: f64, unit_secs: f64) -> Result<Duration, InvalidDuration> {
    Duration::try_from_secs_f64(value * unit_secs).map_err(|_| InvalidDuration { option, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = ThrottleConfig::default();
        assert_eq!(config.max_reports_per_window, 5);
        assert_eq!(config.window().unwrap(), Duration::from_secs(3600));
        assert_eq!(config.cleanup_interval().unwrap(), Duration::from_secs(900));
    }

    #[test]
    fn test_camel_case_keys() {
        let config: ThrottleConfig = serde_json::from_value(json!({
            "maxReportsPerWindow": 2,
            "windowHours": 0.5,
            "cleanupIntervalMinutes": 1
        }))
        .unwrap();

        assert_eq!(config.max_reports_per_window, 2);
        assert_eq!(config.window().unwrap(), Duration::from_secs(1800));
        assert_eq!(config.cleanup_interval().unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config: ThrottleConfig = serde_json::from_value(json!({
            "window_hours": 2,
            "dsn": "https://example.invalid/1"
        }))
        .unwrap();

        assert_eq!(config.window().unwrap(), Duration::from_secs(7200));
        assert_eq!(config.max_reports_per_window, 5);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let config = ThrottleConfig {
            window_hours: -1.0,
            ..ThrottleConfig::default()
        };
        assert_eq!(
            config.window(),
            Err(InvalidDuration {
                option: "window_hours",
                value: -1.0
            })
        );
    }

    #[test]
    fn test_nan_duration_rejected() {
        let config = ThrottleConfig {
            cleanup_interval_minutes: f64::NAN,
            ..ThrottleConfig::default()
        };
        assert!(config.cleanup_interval().is_err());
    }
}
