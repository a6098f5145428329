//! Simulation time provider implementation.

use async_trait::async_trait;
use std::time::Duration;

use diskchaos_core::{TimeError, TimeProvider};

use crate::sim::WeakSimWorld;

/// Simulation time provider that integrates with SimWorld.
///
/// Holds only a weak reference: once the world is dropped, `sleep` fails with
/// [`TimeError::Shutdown`] and `now` reports zero.
#[derive(Debug, Clone)]
pub struct SimTimeProvider {
    sim: WeakSimWorld,
}

impl SimTimeProvider {
    /// Create a new simulation time provider.
    pub fn new(sim: WeakSimWorld) -> Self {
        Self { sim }
    }
}

#[async_trait(?Send)]
impl TimeProvider for SimTimeProvider {
    async fn sleep(&self, duration: Duration) -> Result<(), TimeError> {
        let sleep_future = self.sim.sleep(duration).map_err(|_| TimeError::Shutdown)?;
        sleep_future.await.map_err(|_| TimeError::Shutdown)
    }

    fn now(&self) -> Duration {
        self.sim.now().unwrap_or(Duration::ZERO)
    }

    async fn timeout<F, T>(&self, duration: Duration, future: F) -> Result<T, TimeError>
    where
        F: std::future::Future<Output = T>,
    {
        let sleep_future = self.sim.sleep(duration).map_err(|_| TimeError::Shutdown)?;

        // Both arms advance on simulated time through the event queue
        tokio::select! {
            result = future => Ok(result),
            _ = sleep_future => Err(TimeError::Elapsed),
        }
    }
}
