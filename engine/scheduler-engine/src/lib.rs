//! # Scheduler Engine
//!
//! Tick-driven CPU scheduling simulation. Tasks and ticks arrive over TCP from the Task
//! Feeder and the Clock; a single loop owns the `SchedulerState` and advances it one tick at a
//! time under one of seven policies. When every task has been received and run to completion
//! the engine tells the Clock to stop and produces a `SimulationReport`.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod report;
pub mod service;
pub mod state;
pub mod task;


pub use algorithm::Algorithm;
pub use config::{ReportConfig, ReportFormat, SchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
pub use report::{Averages, SimulationReport, TaskStats, IDLE_MARKER};
pub use service::SchedulerService;
pub use state::{SchedulerState, TickOutcome};
pub use task::ScheduledTask;

/// Current version of the Scheduler Engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Round-Robin quantum, in ticks
pub const DEFAULT_QUANTUM: u64 = 3;

/// Default number of ticks between aging steps for dynamic priority
pub const DEFAULT_AGING_PERIOD: u64 = 5;
