//! Simulated storage: in-memory files and the chaos-wrapping provider.

/// In-memory files and provider
pub mod memory;

/// Provider wrapping opened files in chaos
pub mod provider;

pub use memory::{MemoryStorageFile, MemoryStorageProvider};
pub use provider::ChaosStorageProvider;
