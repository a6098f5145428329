//! Storage chaos: latency and bit-flip injection for simulated disks.
//!
//! ## Submodules
//!
//! - [`config`] - Serializable chaos settings and presets
//! - [`faults`] - Fault config trait, disk failure model, fixed faults
//! - [`metrics`] - Counters for injected delays and bit flips
//! - [`corrupted_bytes`] - Tracker of deliberately corrupted offsets
//! - [`context`] - Services bundle handed to each chaos file
//! - [`file`] - The [`ChaosFile`] wrapper
//!
//! ## Fault Injection
//!
//! | Fault | Source | What it tests |
//! |-------|--------|---------------|
//! | Disk stall | `DiskFailureConfiguration::stall_*` | Timeouts, slow-disk handling |
//! | Disk throttle | `DiskFailureConfiguration::throttle_duration` | Async scheduling |
//! | Bit flip | `bit_flip_percentage` | Checksum validation, recovery |

mod aligned;
pub mod config;
pub mod context;
pub mod corrupted_bytes;
pub mod faults;
pub mod file;
pub mod metrics;

pub use aligned::{AlignedBuffer, PAGE_ALIGNMENT};
pub use config::{ChaosConfiguration, DiskFailureConfiguration};
pub use context::ChaosContext;
pub use corrupted_bytes::CorruptedBytes;
pub use faults::{FixedStorageFaults, StorageFaultConfig, StorageFaultInjector};
pub use file::ChaosFile;
pub use metrics::{ChaosMetrics, ChaosMetricsSnapshot};
