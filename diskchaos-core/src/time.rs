//! Time provider abstraction for simulated and wall-clock time.
//!
//! Chaos delays are always expressed through a [`TimeProvider`] so the same
//! file wrapper can be driven by the simulation clock in tests and by Tokio
//! timers in production.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during time operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The operation timed out.
    #[error("operation timed out")]
    Elapsed,

    /// The clock backing this provider is gone (e.g. the simulation was dropped).
    #[error("time provider shut down")]
    Shutdown,
}

/// Provider trait for time operations.
///
/// Single-core design: futures returned by implementations are not `Send`.
#[async_trait(?Send)]
pub trait TimeProvider: Clone {
    /// Suspend the calling task for `duration`.
    ///
    /// In simulation this schedules a timer event and completes once simulated
    /// time has advanced past it. In production it is a Tokio sleep.
    async fn sleep(&self, duration: Duration) -> Result<(), TimeError>;

    /// Current time, measured from the provider's epoch.
    fn now(&self) -> Duration;

    /// Run a future with a timeout.
    async fn timeout<F, T>(&self, duration: Duration, future: F) -> Result<T, TimeError>
    where
        F: std::future::Future<Output = T>;
}

/// Real time provider using Tokio's timers.
#[derive(Debug, Clone)]
pub struct TokioTimeProvider {
    start_time: tokio::time::Instant,
}

impl TokioTimeProvider {
    /// Create a new Tokio time provider whose epoch is "now".
    pub fn new() -> Self {
        Self {
            start_time: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl TimeProvider for TokioTimeProvider {
    async fn sleep(&self, duration: Duration) -> Result<(), TimeError> {
        tokio::time::sleep(duration).await;
        Ok(())
    }

    fn now(&self) -> Duration {
        self.start_time.elapsed()
    }

    async fn timeout<F, T>(&self, duration: Duration, future: F) -> Result<T, TimeError>
    where
        F: std::future::Future<Output = T>,
    {
        tokio::time::timeout(duration, future)
            .await
            .map_err(|_| TimeError::Elapsed)
    }
}
