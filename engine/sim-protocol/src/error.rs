//! Error types for the wire protocol and transport

use thiserror::Error;

/// Errors raised while encoding, decoding or moving messages between components
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Empty payload")]
    EmptyPayload,

    #[error("Payload is not valid UTF-8")]
    NonUtf8Payload,

    #[error("Payload exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Invalid tick value: {0}")]
    InvalidTick(String),

    #[error("Invalid task {id}: {reason}")]
    InvalidTask { id: String, reason: String },

    #[error("Failed to bind listener on {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },

    #[error("Failed to connect to {addr}: {source}")]
    Connect { addr: String, source: std::io::Error },

    #[error("Timed out talking to {addr}")]
    Timeout { addr: String },
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
