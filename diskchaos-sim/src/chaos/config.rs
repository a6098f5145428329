//! # Chaos Configuration
//!
//! Settings for the storage chaos layer of a simulation run, in the same
//! plain-struct-with-presets shape as the rest of the simulation config.
//!
//! | Setting | Field | Default | Effect |
//! |---------|-------|---------|--------|
//! | Chaos switch | `enabled` | `false` | Whether chaos storage wraps files at all |
//! | Bit flips | `bit_flip_percentage` | `0.0` | Percent of writes with one flipped bit |
//! | Disk failure | `disk_failure` | `None` | Stall and throttle windows |
//!
//! Configurations are serde-serializable so a run's chaos settings can be
//! recorded next to its seed and replayed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use diskchaos_core::RandomProvider;

use crate::providers::SimRandomProvider;

/// Stall and throttle windows applied to the storage fault injector.
///
/// Modelled on a failing disk: during the stall window each operation waits
/// for the next `stall_interval` boundary; during the throttle window each
/// operation pays a small extra latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskFailureConfiguration {
    /// Period of the stall boundary.
    pub stall_interval: Duration,
    /// How long the disk stays stalled, measured from when the config is applied.
    pub stall_duration: Duration,
    /// How long the disk stays throttled, measured from when the config is applied.
    pub throttle_duration: Duration,
}

/// Chaos settings for the storage layer of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChaosConfiguration {
    /// Whether files opened through chaos storage get fault injection.
    pub enabled: bool,

    /// Percentage (0-100) of writes that get a single bit flipped.
    pub bit_flip_percentage: f64,

    /// Optional disk stall/throttle windows.
    pub disk_failure: Option<DiskFailureConfiguration>,
}

impl Default for ChaosConfiguration {
    fn default() -> Self {
        Self::disabled()
    }
}

impl ChaosConfiguration {
    /// No chaos at all: files are passed through untouched.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            bit_flip_percentage: 0.0,
            disk_failure: None,
        }
    }

    /// Chaos enabled with bit flips only, no added latency.
    pub fn bit_flips_only(percentage: f64) -> Self {
        Self {
            enabled: true,
            bit_flip_percentage: percentage,
            disk_failure: None,
        }
    }

    /// Chaos enabled with disk stalls and throttling only.
    pub fn disk_failure_only(disk_failure: DiskFailureConfiguration) -> Self {
        Self {
            enabled: true,
            bit_flip_percentage: 0.0,
            disk_failure: Some(disk_failure),
        }
    }

    /// Randomized chaos parameters drawn from the run's seeded RNG.
    pub fn random_for_seed(random: &SimRandomProvider) -> Self {
        let bit_flip_percentage = if random.random_bool(0.5) {
            random.random_range(1..20u32) as f64 / 10.0
        } else {
            0.0
        };

        let disk_failure = random.random_bool(0.5).then(|| DiskFailureConfiguration {
            stall_interval: Duration::from_millis(random.random_range(1..10)),
            stall_duration: Duration::from_millis(random.random_range(0..500)),
            throttle_duration: Duration::from_millis(random.random_range(0..2_000)),
        });

        Self {
            enabled: true,
            bit_flip_percentage,
            disk_failure,
        }
    }

    /// Serialize to JSON, e.g. to store next to a failing seed.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Load a configuration previously written by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
