//! # SimulationClock
//!
//! The heartbeat of the scheduling simulation. Each cycle the clock sends the current tick to
//! the Task Feeder, waits a short delay, sends the same tick to the Scheduler Engine and
//! advances. A small control-plane listener accepts the Scheduler's termination command,
//! after which the in-flight cycle completes and the clock stops.

pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;


#[cfg(test)]
mod integration_tests;

pub use clock::{ClockPeers, ClockRunSummary, ClockState, SimulationClock};
pub use config::{ClockConfig, MonitoringConfig};
pub use error::ClockError;
pub use metrics::{ClockMetrics, MetricsCollector};

/// Re-export commonly used types
pub use sim_protocol::Tick;

/// Current version of the SimulationClock
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tick period (10 ticks per second)
pub const DEFAULT_TICK_PERIOD_MS: u64 = 100;

/// Default delay between the Feeder send and the Scheduler send of one cycle
pub const DEFAULT_FEEDER_DELAY_MS: u64 = 5;

/// Default number of ticks between metrics log lines
pub const DEFAULT_METRICS_INTERVAL_TICKS: u64 = 50;
