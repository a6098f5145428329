//! Counters describing how much chaos a run actually injected.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared chaos counters for one simulation run.
///
/// Cloning hands out another handle to the same counters.
#[derive(Debug, Clone)]
pub struct ChaosMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    disk_delays: AtomicU64,
    bit_flips: AtomicU64,
    /// Nanoseconds of simulated time at creation or last clear.
    start_time: AtomicU64,
}

/// Point-in-time copy of [`ChaosMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaosMetricsSnapshot {
    /// Operations that were delayed by a non-zero amount.
    pub disk_delays: u64,
    /// Writes that had a bit flipped.
    pub bit_flips: u64,
    /// Time elapsed since the counters were started or last cleared.
    pub elapsed: Duration,
}

impl ChaosMetrics {
    /// Create zeroed counters starting at `now`.
    pub fn new(now: Duration) -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                disk_delays: AtomicU64::new(0),
                bit_flips: AtomicU64::new(0),
                start_time: AtomicU64::new(now.as_nanos() as u64),
            }),
        }
    }

    /// Count one delayed operation.
    pub fn increment_disk_delays(&self) {
        self.inner.disk_delays.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one corrupted write.
    pub fn increment_bit_flips(&self) {
        self.inner.bit_flips.fetch_add(1, Ordering::Relaxed);
    }

    /// Operations delayed so far.
    pub fn disk_delays(&self) -> u64 {
        self.inner.disk_delays.load(Ordering::Relaxed)
    }

    /// Writes corrupted so far.
    pub fn bit_flips(&self) -> u64 {
        self.inner.bit_flips.load(Ordering::Relaxed)
    }

    /// When counting started.
    pub fn start_time(&self) -> Duration {
        Duration::from_nanos(self.inner.start_time.load(Ordering::Relaxed))
    }

    /// Zero the counters and restart the clock at `now`.
    pub fn clear(&self, now: Duration) {
        self.inner.disk_delays.store(0, Ordering::Relaxed);
        self.inner.bit_flips.store(0, Ordering::Relaxed);
        self.inner
            .start_time
            .store(now.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Copy the counters.
    pub fn snapshot(&self, now: Duration) -> ChaosMetricsSnapshot {
        ChaosMetricsSnapshot {
            disk_delays: self.disk_delays(),
            bit_flips: self.bit_flips(),
            elapsed: now.saturating_sub(self.start_time()),
        }
    }

    /// Emit the counters as a structured log event.
    pub fn log(&self, now: Duration) {
        let snapshot = self.snapshot(now);
        tracing::info!(
            disk_delays = snapshot.disk_delays,
            bit_flips = snapshot.bit_flips,
            elapsed = ?snapshot.elapsed,
            "chaos metrics"
        );
    }
}

impl Default for ChaosMetrics {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}
