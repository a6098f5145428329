//! # diskchaos-core
//!
//! Provider abstractions shared by the diskchaos simulation crate and by
//! production code that links the chaos file wrapper into its storage path.
//!
//! - [`TimeProvider`]: sleep, timeout and "now", simulated or wall-clock
//! - [`RandomProvider`]: seedable randomness behind an explicit handle
//! - [`StorageFile`] / [`StorageProvider`]: positional async file I/O
//! - [`SimulationError`]: errors raised by the simulation engine

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod error;
mod random;
mod storage;
mod time;

pub use error::{SimulationError, SimulationResult};
pub use random::{RandomProvider, TokioRandomProvider};
pub use storage::{
    OpenOptions, StorageFile, StorageProvider, TokioStorageFile, TokioStorageProvider,
};
pub use time::{TimeError, TimeProvider, TokioTimeProvider};
