//! Scheduling Simulator Service Library
//!
//! Configuration loading, logging setup, signal handling and the supervision code that
//! starts the Clock, the Task Feeder and the Scheduler Engine, either together in one
//! process or one per process.

use anyhow::{Context, Result};
use std::path::Path;

pub mod config;
pub mod logging;
pub mod service;
pub mod signals;

pub use config::{LoggingConfig, ServiceConfig};
pub use logging::{initialize_logging, initialize_logging_with_config};
pub use service::{
    run_clock, run_feeder, run_scheduler, run_simulation, BoundListeners, ResolvedAddrs, SimulationOutcome,
};
pub use signals::{join_with_timeout, setup_signal_handlers};

/// Load configuration from an optional file and environment variables
pub fn load_configuration(path: Option<&Path>) -> Result<ServiceConfig> {
    config::load_config(path).context("Failed to load service configuration")
}
