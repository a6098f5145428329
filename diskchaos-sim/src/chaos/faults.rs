//! Storage fault configuration: how much to delay an operation and how often
//! to corrupt a write.
//!
//! [`StorageFaultInjector`] models a failing disk the way FoundationDB's
//! simulator does: a stall window during which every operation waits for the
//! next stall-interval boundary, and a throttle window adding a small random
//! latency. It also carries the bit-flip percentage consulted by chaos writes.

use std::cell::Cell;
use std::time::Duration;

use diskchaos_core::{RandomProvider, TimeProvider};

use super::ChaosConfiguration;

/// Lower bound of the per-operation throttle latency.
const THROTTLE_MIN: Duration = Duration::from_millis(1);

/// Source of storage faults consulted by [`ChaosFile`](super::ChaosFile).
///
/// Queried on every operation; implementations may change their answers
/// over time (e.g. as simulated time leaves a stall window).
pub trait StorageFaultConfig {
    /// Delay to apply before the next operation is submitted.
    fn disk_delay(&self) -> Duration;

    /// Percentage (0-100) of writes that should have one bit flipped.
    fn bit_flip_percentage(&self) -> f64;
}

/// Disk stall/throttle model plus bit flipper, driven by a time provider and
/// the run's seeded RNG.
#[derive(Debug)]
pub struct StorageFaultInjector<T: TimeProvider, R: RandomProvider> {
    time: T,
    random: R,
    stall_interval: Cell<Duration>,
    stall_until: Cell<Duration>,
    throttle_until: Cell<Duration>,
    bit_flip_percentage: Cell<f64>,
}

impl<T: TimeProvider, R: RandomProvider> StorageFaultInjector<T, R> {
    /// Create an injector with no active failure and no bit flips.
    pub fn new(time: T, random: R) -> Self {
        Self {
            time,
            random,
            stall_interval: Cell::new(Duration::ZERO),
            stall_until: Cell::new(Duration::ZERO),
            throttle_until: Cell::new(Duration::ZERO),
            bit_flip_percentage: Cell::new(0.0),
        }
    }

    /// Start (or extend) a disk failure from the current time.
    ///
    /// Windows only ever grow: a shorter request does not cut an already
    /// scheduled stall or throttle short. Window ends saturate at `Duration::MAX`.
    pub fn set_disk_failure(
        &self,
        interval: Duration,
        stall_for: Duration,
        throttle_for: Duration,
    ) {
        let now = self.time.now();
        self.stall_interval.set(interval);
        let stall_until = now.saturating_add(stall_for);
        self.stall_until.set(self.stall_until.get().max(stall_until));
        let throttle_until = now.saturating_add(throttle_for);
        self.throttle_until.set(self.throttle_until.get().max(throttle_until));

        tracing::debug!(
            ?interval,
            stall_until = ?self.stall_until.get(),
            throttle_until = ?self.throttle_until.get(),
            "disk failure scheduled"
        );
    }

    /// Set the percentage of writes that get a bit flipped.
    pub fn set_bit_flip_percentage(&self, percentage: f64) {
        self.bit_flip_percentage.set(percentage);
    }

    /// Time left until the next stall-interval boundary while stalled.
    pub fn stall_delay(&self) -> Duration {
        let now = self.time.now();
        let interval = self.stall_interval.get();
        if self.stall_until.get() <= now || interval.is_zero() {
            return Duration::ZERO;
        }

        let into_interval = now.as_nanos() % interval.as_nanos();
        interval - Duration::from_nanos(into_interval as u64)
    }

    /// Random 1-2ms latency while throttled.
    pub fn throttle_delay(&self) -> Duration {
        if self.throttle_until.get() <= self.time.now() {
            return Duration::ZERO;
        }
        THROTTLE_MIN + THROTTLE_MIN.mul_f64(self.random.random_ratio())
    }

    /// Drop every active window and the bit-flip percentage.
    pub fn clear(&self) {
        self.stall_interval.set(Duration::ZERO);
        self.stall_until.set(Duration::ZERO);
        self.throttle_until.set(Duration::ZERO);
        self.bit_flip_percentage.set(0.0);
    }

    /// Reset, then apply the bit flips and disk failure of `config`.
    pub fn apply(&self, config: &ChaosConfiguration) {
        self.clear();
        self.set_bit_flip_percentage(config.bit_flip_percentage);
        if let Some(disk) = &config.disk_failure {
            self.set_disk_failure(
                disk.stall_interval,
                disk.stall_duration,
                disk.throttle_duration,
            );
        }
    }
}

impl<T: TimeProvider, R: RandomProvider> StorageFaultConfig for StorageFaultInjector<T, R> {
    fn disk_delay(&self) -> Duration {
        self.stall_delay().saturating_add(self.throttle_delay())
    }

    fn bit_flip_percentage(&self) -> f64 {
        self.bit_flip_percentage.get()
    }
}

/// Fault config returning fixed, directly settable values.
///
/// Useful when a test needs an exact delay or a guaranteed corruption.
#[derive(Debug, Default)]
pub struct FixedStorageFaults {
    disk_delay: Cell<Duration>,
    bit_flip_percentage: Cell<f64>,
}

impl FixedStorageFaults {
    /// Create a fault config with the given delay and bit-flip percentage.
    pub fn new(disk_delay: Duration, bit_flip_percentage: f64) -> Self {
        Self {
            disk_delay: Cell::new(disk_delay),
            bit_flip_percentage: Cell::new(bit_flip_percentage),
        }
    }

    /// Change the delay returned from now on.
    pub fn set_disk_delay(&self, delay: Duration) {
        self.disk_delay.set(delay);
    }

    /// Change the bit-flip percentage returned from now on.
    pub fn set_bit_flip_percentage(&self, percentage: f64) {
        self.bit_flip_percentage.set(percentage);
    }
}

impl StorageFaultConfig for FixedStorageFaults {
    fn disk_delay(&self) -> Duration {
        self.disk_delay.get()
    }

    fn bit_flip_percentage(&self) -> f64 {
        self.bit_flip_percentage.get()
    }
}
