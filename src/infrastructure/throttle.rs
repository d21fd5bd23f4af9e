//! Public throttle façade.
//!
//! `ReportThrottle` wires the fingerprint registry, the rate limiter and the
//! background sweeper together, and adapts decisions to the "return the
//! event or nothing" contract of an error-tracking client's pre-send hook.

use crate::application::{
    limiter::RateLimiter,
    metrics::Metrics,
    ports::Clock,
    registry::FingerprintRegistry,
    sweeper::{SweeperConfig, SweeperConfigError, DEFAULT_CLEANUP_INTERVAL},
};
use crate::domain::{
    event::ErrorEvent,
    fingerprint::Fingerprint,
    policy::{PolicyError, ReportDecision, WindowPolicy, DEFAULT_MAX_REPORTS_PER_WINDOW, DEFAULT_WINDOW},
    stats::TrackerStats,
    window::CounterEntry,
};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::config::{InvalidDuration, ThrottleConfig};
use crate::infrastructure::storage::ShardedStorage;

use std::borrow::Borrow;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "async")]
use crate::application::sweeper::{ShutdownError, Sweeper, SweeperHandle};

#[cfg(feature = "async")]
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(feature = "async")]
use tokio::runtime::Handle;

/// Storage used by `ReportThrottle`.
pub type DefaultStorage = Arc<ShardedStorage<Fingerprint, CounterEntry>>;

/// Error returned when building a `ReportThrottle` fails.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Admit cap or window out of range
    Policy(PolicyError),
    /// Sweeper configuration validation failed
    Sweeper(SweeperConfigError),
    /// A configured number could not be converted to a duration
    InvalidDuration(InvalidDuration),
    /// Background sweeping was required but no tokio runtime is available
    #[cfg(feature = "async")]
    NoRuntime,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::Policy(e) => write!(f, "invalid window policy: {}", e),
            BuildError::Sweeper(e) => write!(f, "sweeper configuration error: {}", e),
            BuildError::InvalidDuration(e) => write!(f, "invalid configuration: {}", e),
            #[cfg(feature = "async")]
            BuildError::NoRuntime => {
                write!(f, "background sweep requires a running tokio runtime")
            }
        }
    }
}

impl std::error::Error for BuildError {}

impl From<PolicyError> for BuildError {
    fn from(e: PolicyError) -> Self {
        BuildError::Policy(e)
    }
}

impl From<SweeperConfigError> for BuildError {
    fn from(e: SweeperConfigError) -> Self {
        BuildError::Sweeper(e)
    }
}

impl From<InvalidDuration> for BuildError {
    fn from(e: InvalidDuration) -> Self {
        BuildError::InvalidDuration(e)
    }
}

/// Builder for constructing a `ReportThrottle`.
pub struct ReportThrottleBuilder {
    max_reports_per_window: usize,
    window: Duration,
    cleanup_interval: Duration,
    clock: Option<Arc<dyn Clock>>,
    background_sweep: Option<bool>,
    #[cfg(feature = "async")]
    runtime: Option<Handle>,
    window_error: Option<InvalidDuration>,
    cleanup_interval_error: Option<InvalidDuration>,
}

impl ReportThrottleBuilder {
    /// Set the admit cap per window per fingerprint.
    pub fn with_max_reports_per_window(mut self, max: usize) -> Self {
        self.max_reports_per_window = max;
        self
    }

    /// Set the window length.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self.window_error = None;
        self
    }

    /// Set how often stale fingerprints are swept.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self.cleanup_interval_error = None;
        self
    }

    /// Apply all options from a `ThrottleConfig`.
    ///
    /// Conversion errors are reported by `build()`, unless a later
    /// `with_window` or `with_cleanup_interval` replaces the bad option.
    pub fn with_config(mut self, config: &ThrottleConfig) -> Self {
        self.max_reports_per_window = config.max_reports_per_window;
        match config.window() {
            Ok(window) => self = self.with_window(window),
            Err(e) => self.window_error = Some(e),
        }
        match config.cleanup_interval() {
            Ok(interval) => self = self.with_cleanup_interval(interval),
            Err(e) => self.cleanup_interval_error = Some(e),
        }
        self
    }

    /// Set a custom clock (for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Choose whether a background task sweeps stale fingerprints.
    ///
    /// By default the sweeper starts whenever a tokio runtime is available.
    /// Otherwise `should_report` itself sweeps once per cleanup interval.
    /// Passing `true` makes a missing runtime a build error; passing `false`
    /// leaves sweeping to explicit `ReportThrottle::sweep()` calls.
    pub fn with_background_sweep(mut self, enabled: bool) -> Self {
        self.background_sweep = Some(enabled);
        self
    }

    /// Run the sweeper on a specific runtime instead of the current one.
    #[cfg(feature = "async")]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the throttle.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration is invalid, or if background
    /// sweeping was explicitly requested without a tokio runtime.
    pub fn build(self) -> Result<ReportThrottle, BuildError> {
        if let Some(e) = self.window_error.or(self.cleanup_interval_error) {
            return Err(e.into());
        }

        let policy = WindowPolicy::new(self.max_reports_per_window, self.window)?;
        let sweeper_config = SweeperConfig::new(self.cleanup_interval)?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
        let storage: DefaultStorage = Arc::new(ShardedStorage::new());
        let registry = FingerprintRegistry::new(storage, clock);
        let limiter = RateLimiter::new(registry, policy, Metrics::new());

        #[cfg(feature = "async")]
        let sweeper = {
            let runtime = self.runtime.or_else(|| Handle::try_current().ok());
            match (self.background_sweep, runtime) {
                (Some(false), _) => None,
                (_, Some(runtime)) => {
                    Some(Sweeper::new(limiter.clone(), sweeper_config.clone()).start(&runtime))
                }
                (Some(true), None) => return Err(BuildError::NoRuntime),
                (None, None) => None,
            }
        };

        #[cfg(feature = "async")]
        let sweep_inline = self.background_sweep.is_none() && sweeper.is_none();

        #[cfg(not(feature = "async"))]
        let sweep_inline = self.background_sweep != Some(false);

        let limiter = if sweep_inline {
            tracing::debug!(
                interval = ?sweeper_config.interval,
                "no background sweeper, sweeping stale fingerprints from should_report"
            );
            limiter.with_inline_sweep(sweeper_config.interval)
        } else {
            limiter
        };

        Ok(ReportThrottle {
            limiter,
            #[cfg(feature = "async")]
            sweeper: Arc::new(Mutex::new(sweeper)),
        })
    }
}

/// Fingerprint-based rate limiter for error reports.
///
/// Clones share state: the counters, the metrics and the sweeper. The
/// sweeper task is aborted when the last clone is dropped.
#[derive(Clone)]
pub struct ReportThrottle {
    limiter: RateLimiter<DefaultStorage>,
    #[cfg(feature = "async")]
    sweeper: Arc<Mutex<Option<SweeperHandle>>>,
}

impl ReportThrottle {
    /// Create a builder for configuring the throttle.
    ///
    /// Defaults:
    /// - Max reports per window: 5
    /// - Window: 1 hour
    /// - Cleanup interval: 15 minutes
    /// - Background sweep: on when a tokio runtime is available
    pub fn builder() -> ReportThrottleBuilder {
        ReportThrottleBuilder {
            max_reports_per_window: DEFAULT_MAX_REPORTS_PER_WINDOW,
            window: DEFAULT_WINDOW,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            clock: None,
            background_sweep: None,
            #[cfg(feature = "async")]
            runtime: None,
            window_error: None,
            cleanup_interval_error: None,
        }
    }

    /// Create a throttle with default settings.
    ///
    /// # Panics
    /// This method cannot panic because all default values are valid.
    pub fn new() -> Self {
        Self::builder()
            .build()
            .expect("default configuration is always valid")
    }

    /// Create a throttle from deserialized options.
    ///
    /// # Errors
    /// Returns `BuildError` if the options are out of range.
    pub fn from_config(config: &ThrottleConfig) -> Result<Self, BuildError> {
        Self::builder().with_config(config).build()
    }

    /// Decide whether an error report should be sent.
    ///
    /// Returns `true` to send, `false` to suppress it as a duplicate.
    pub fn should_report(&self, event: &ErrorEvent) -> bool {
        self.decide(event).is_admit()
    }

    /// Decide whether an error report should be sent.
    pub fn decide(&self, event: &ErrorEvent) -> ReportDecision {
        self.limiter.check_event(event)
    }

    /// Decide for an already computed fingerprint.
    pub fn check(&self, fingerprint: Fingerprint) -> ReportDecision {
        self.limiter.check(fingerprint)
    }

    /// Pass an event through the throttle.
    ///
    /// Returns the event unchanged when admitted and `None` when it should
    /// not be sent.
    pub fn filter<E>(&self, event: E) -> Option<E>
    where
        E: Borrow<ErrorEvent>,
    {
        self.should_report(event.borrow()).then_some(event)
    }

    /// Pre-send hook for an error-tracking client.
    ///
    /// ```
    /// use report_throttle::{ErrorEvent, Exception, ReportThrottle};
    ///
    /// let throttle = ReportThrottle::builder()
    ///     .with_max_reports_per_window(1)
    ///     .with_background_sweep(false)
    ///     .build()
    ///     .unwrap();
    /// let hook = throttle.before_send();
    ///
    /// let event = ErrorEvent::new().with_exception(Exception::new("TypeError", "x is undefined"));
    /// assert!(hook(event.clone()).is_some());
    /// assert!(hook(event).is_none());
    /// ```
    pub fn before_send<E>(&self) -> impl Fn(E) -> Option<E> + Send + Sync + 'static
    where
        E: Borrow<ErrorEvent> + 'static,
    {
        let throttle = self.clone();
        move |event| throttle.filter(event)
    }

    /// Snapshot of every tracked fingerprint. Never modifies state.
    pub fn stats(&self) -> TrackerStats {
        self.limiter.stats()
    }

    /// Number of tracked fingerprints.
    pub fn tracked_errors(&self) -> usize {
        self.limiter.registry().len()
    }

    /// Evict stale fingerprints now, independent of the background sweeper.
    ///
    /// Returns the number of evicted fingerprints.
    pub fn sweep(&self) -> usize {
        self.limiter.sweep()
    }

    /// Get the window policy.
    pub fn policy(&self) -> &WindowPolicy {
        self.limiter.policy()
    }

    /// Get throttling metrics.
    pub fn metrics(&self) -> &Metrics {
        self.limiter.metrics()
    }

    /// Check if the background sweeper is running.
    ///
    /// A throttle built without a runtime reports `false` here and sweeps
    /// from `should_report` instead.
    #[cfg(feature = "async")]
    pub fn is_sweeping(&self) -> bool {
        self.sweeper_slot()
            .as_ref()
            .is_some_and(SweeperHandle::is_running)
    }

    /// Stop the background sweeper and forget every tracked fingerprint.
    ///
    /// Safe to call any number of times. The throttle keeps working
    /// afterwards, without a sweeper.
    pub fn destroy(&self) {
        #[cfg(feature = "async")]
        {
            let handle = self.sweeper_slot().take();
            if let Some(mut handle) = handle {
                handle.stop();
            }
        }
        self.limiter.registry().clear();
        tracing::debug!("report throttle destroyed");
    }

    /// Like `destroy()`, but waits for the sweeper task to exit.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the sweeper task panicked or was cancelled.
    /// Tracked state is cleared either way.
    #[cfg(feature = "async")]
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        // Release the lock before awaiting
        let handle = self.sweeper_slot().take();
        self.limiter.registry().clear();

        match handle {
            Some(handle) => handle.shutdown().await,
            None => Ok(()),
        }
    }

    #[cfg(feature = "async")]
    fn sweeper_slot(&self) -> MutexGuard<'_, Option<SweeperHandle>> {
        self.sweeper.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ReportThrottle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReportThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportThrottle")
            .field("policy", self.policy())
            .field("tracked_errors", &self.tracked_errors())
            .finish_non_exhaustive()
    }
}
