//! Error types for the Task Feeder

use std::path::PathBuf;

use thiserror::Error;

/// Result type for Task Feeder operations
pub type FeederResult<T> = Result<T, FeederError>;

/// Errors that can occur while loading or feeding tasks
#[derive(Error, Debug)]
pub enum FeederError {
    #[error("Failed to read task file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("Invalid task on line {line}: {reason}")]
    InvalidTask { line: usize, reason: String },

    #[error("Task set is empty")]
    EmptyTaskSet,
}
