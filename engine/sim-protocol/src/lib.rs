//! # sim-protocol
//!
//! Shared vocabulary of the scheduling simulator: the task value type, the wire codec used
//! between the Clock, the Task Feeder and the Scheduler Engine, and the short-lived
//! one-connection-per-message TCP transport all three components speak.

pub mod config;
pub mod error;
pub mod message;
pub mod shutdown;
pub mod transport;
pub mod types;

pub use config::{NetworkConfig, TickOrdering, TransportConfig};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{Message, TaskEnvelope, TERMINATION_TOKEN};
pub use shutdown::{shutdown_channel, ShutdownListener, ShutdownSignal};
pub use transport::{bind_listener, deliver, read_message, run_listener, send_message};
pub use types::{TaskId, TaskSpec, Tick};

/// Current version of the protocol crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
