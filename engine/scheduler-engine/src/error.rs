//! Error types for the Scheduler Engine

use std::path::PathBuf;

use thiserror::Error;

/// Result type for Scheduler Engine operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors raised while configuring the engine or writing its report
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Unknown scheduling algorithm '{0}' (expected one of fcfs, rr, sjf, srtf, prioc, priop, priod)")]
    UnknownAlgorithm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to write report {path}: {source}")]
    Report { path: PathBuf, source: std::io::Error },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
