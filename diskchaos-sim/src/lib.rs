//! # diskchaos-sim
//!
//! Deterministic simulation for storage code, with a fault-injecting file
//! wrapper in the spirit of FoundationDB's chaos files.
//!
//! Same seed, same run: logical time only moves when [`SimWorld::step`]
//! processes an event, and every random decision draws from one seeded RNG.
//!
//! ## Core Components
//!
//! - [`SimWorld`]: logical time, event queue and the run's chaos services
//! - [`ChaosFile`]: delays operations and flips bits in writes
//! - [`StorageFaultInjector`]: disk stall/throttle model and bit flipper
//! - [`CorruptedBytes`]: which offsets were corrupted on purpose
//! - [`ChaosStorageProvider`]: opens files already wrapped in chaos
//!
//! ## Quick Start
//!
//! ```ignore
//! use diskchaos_sim::{ChaosConfiguration, SimWorld, OpenOptions, StorageProvider};
//!
//! let mut sim = SimWorld::new_with_chaos_config(ChaosConfiguration::bit_flips_only(1.0), 42);
//! let storage = sim.chaos_storage_provider();
//!
//! let handle = tokio::task::spawn_local(async move {
//!     let file = storage.open("wal", OpenOptions::read_write_create()).await?;
//!     file.write(b"record", 0).await
//! });
//!
//! while !handle.is_finished() {
//!     while sim.pending_event_count() > 0 {
//!         sim.step();
//!     }
//!     tokio::task::yield_now().await;
//! }
//! ```
//!
//! ## Fault Injection Overview
//!
//! | Mechanism | Default | What it tests |
//! |-----------|---------|---------------|
//! | Disk stall | disabled | Timeouts, slow-disk handling |
//! | Disk throttle | disabled | Async scheduling |
//! | Bit flip corruption | 0% | Checksum validation, recovery |

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod chaos;
pub mod providers;
pub mod sim;
pub mod storage;

pub use diskchaos_core::{
    OpenOptions, RandomProvider, SimulationError, SimulationResult, StorageFile, StorageProvider,
    TimeError, TimeProvider, TokioRandomProvider, TokioStorageFile, TokioStorageProvider,
    TokioTimeProvider,
};

pub use chaos::{
    AlignedBuffer, ChaosConfiguration, ChaosContext, ChaosFile, ChaosMetrics,
    ChaosMetricsSnapshot, CorruptedBytes, DiskFailureConfiguration, FixedStorageFaults,
    StorageFaultConfig, StorageFaultInjector,
};
pub use providers::{SimRandomProvider, SimTimeProvider};
pub use sim::{Event, SimFaultInjector, SimWorld, SleepFuture, WeakSimWorld};
pub use storage::{ChaosStorageProvider, MemoryStorageFile, MemoryStorageProvider};
