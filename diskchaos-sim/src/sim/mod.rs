//! Core simulation engine for deterministic testing.
//!
//! This module provides the central SimWorld coordinator that manages logical
//! time, event processing and the chaos services of a simulation run.
//!
//! ## Submodules
//!
//! - `world` - Core SimWorld and WeakSimWorld types
//! - `events` - Event types and queue for scheduling
//! - `sleep` - Sleep future for simulation time

pub mod events;
pub mod sleep;
pub mod world;

pub use events::{Event, EventQueue, ScheduledEvent};
pub use sleep::SleepFuture;
pub use world::{SimFaultInjector, SimWorld, WeakSimWorld};
