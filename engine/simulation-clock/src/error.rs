//! Error types for SimulationClock

use thiserror::Error;

/// Errors that can occur in the SimulationClock
#[derive(Error, Debug)]
pub enum ClockError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Clock loop is already running or has already run")]
    ClockAlreadyRunning,
}
