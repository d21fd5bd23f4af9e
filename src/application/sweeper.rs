//! Periodic eviction of stale fingerprints.
//!
//! Fingerprints that stop recurring are never touched by the admit path
//! again, so without a sweep they would stay in memory forever. The sweeper
//! runs on a fixed period independent of report traffic and removes every
//! fingerprint inactive for longer than one window.

use crate::application::{limiter::RateLimiter, ports::Storage};
use crate::domain::{fingerprint::Fingerprint, window::CounterEntry};
use std::time::Duration;
use tracing::{info, trace};

#[cfg(feature = "async")]
use tokio::{
    runtime::Handle,
    sync::oneshot,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};

#[cfg(feature = "async")]
use tracing::debug;

/// Default sweep period (15 minutes).
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Error returned when sweeper configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweeperConfigError {
    /// Cleanup interval must be greater than zero
    ZeroInterval,
}

impl std::fmt::Display for SweeperConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweeperConfigError::ZeroInterval => {
                write!(f, "cleanup interval must be greater than 0")
            }
        }
    }
}

impl std::error::Error for SweeperConfigError {}

/// Configuration for the sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweeperConfig {
    /// How often to sweep
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl SweeperConfig {
    /// Create a new sweeper config with the specified interval.
    ///
    /// # Errors
    /// Returns `SweeperConfigError::ZeroInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, SweeperConfigError> {
        if interval.is_zero() {
            return Err(SweeperConfigError::ZeroInterval);
        }
        Ok(Self { interval })
    }
}

/// Evicts stale fingerprints from a rate limiter's registry.
pub struct Sweeper<S>
where
    S: Storage<Fingerprint, CounterEntry> + Clone,
{
    limiter: RateLimiter<S>,
    config: SweeperConfig,
}

impl<S> Sweeper<S>
where
    S: Storage<Fingerprint, CounterEntry> + Clone,
{
    /// Create a new sweeper over the given limiter's state.
    pub fn new(limiter: RateLimiter<S>, config: SweeperConfig) -> Self {
        Self { limiter, config }
    }

    /// Run one sweep now.
    ///
    /// Returns the number of evicted fingerprints.
    pub fn sweep_once(&self) -> usize {
        let evicted = self.limiter.sweep();
        if evicted > 0 {
            info!(
                evicted,
                remaining = self.limiter.registry().len(),
                "evicted stale error fingerprints"
            );
        } else {
            trace!("sweep found no stale error fingerprints");
        }
        evicted
    }

    /// Start sweeping periodically on the given runtime.
    ///
    /// The first sweep runs one interval after start. The task runs until
    /// the returned handle is stopped, shut down, or dropped.
    #[cfg(feature = "async")]
    pub fn start(self, runtime: &Handle) -> SweeperHandle
    where
        S: Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let period = self.config.interval;

        let join_handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(interval = ?period, "fingerprint sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_once();
                    }
                    _ = &mut shutdown_rx => {
                        debug!("fingerprint sweeper stopped");
                        break;
                    }
                }
            }
        });

        SweeperHandle {
            shutdown_tx: Some(shutdown_tx),
            join_handle: Some(join_handle),
        }
    }

    /// Get the sweeper configuration.
    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }
}

/// Error returned when the sweeper task does not finish cleanly.
#[cfg(feature = "async")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    /// The sweeper task panicked
    TaskPanicked,
    /// The sweeper task was cancelled before it could stop
    TaskCancelled,
}

#[cfg(feature = "async")]
impl std::fmt::Display for ShutdownError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownError::TaskPanicked => write!(f, "sweeper task panicked"),
            ShutdownError::TaskCancelled => write!(f, "sweeper task was cancelled"),
        }
    }
}

#[cfg(feature = "async")]
impl std::error::Error for ShutdownError {}

/// Owned handle to a running sweeper task.
///
/// Dropping the handle aborts the task.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

#[cfg(feature = "async")]
impl SweeperHandle {
    /// Signal the task to stop without waiting for it.
    ///
    /// Calling this more than once is a no-op.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // The receiver is gone only if the task already exited
            let _ = tx.send(());
        }
    }

    /// Check if the task is still running.
    pub fn is_running(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the task to stop and wait for it to exit.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the task panicked or was cancelled.
    pub async fn shutdown(mut self) -> Result<(), ShutdownError> {
        self.stop();
        let Some(handle) = self.join_handle.take() else {
            return Ok(());
        };
        handle.await.map_err(|e| {
            if e.is_panic() {
                ShutdownError::TaskPanicked
            } else {
                ShutdownError::TaskCancelled
            }
        })
    }
}

#[cfg(feature = "async")]
impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            handle.abort();
        }
    }
}
