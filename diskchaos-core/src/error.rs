//! Error types shared by the simulation engine and its providers.

use thiserror::Error;

/// Errors that can occur during simulation operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// The simulation has been shut down and is no longer accessible.
    #[error("Simulation has been shut down")]
    SimulationShutdown,
    /// An I/O error occurred during simulation.
    #[error("I/O error: {0}")]
    IoError(String),
}

/// A type alias for `Result<T, SimulationError>`.
pub type SimulationResult<T> = Result<T, SimulationError>;

impl From<std::io::Error> for SimulationError {
    fn from(err: std::io::Error) -> Self {
        SimulationError::IoError(err.to_string())
    }
}

impl From<SimulationError> for std::io::Error {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::SimulationShutdown => {
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "simulation shutdown")
            }
            other => std::io::Error::other(other.to_string()),
        }
    }
}
