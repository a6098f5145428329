//! Provider implementations for simulation.
//!
//! Simulation-specific implementations of the provider traits defined in
//! diskchaos-core.

mod random;
mod time;

pub use random::SimRandomProvider;
pub use time::SimTimeProvider;
