//! Configuration for SimulationClock

use crate::error::ClockError;
use crate::{DEFAULT_FEEDER_DELAY_MS, DEFAULT_METRICS_INTERVAL_TICKS, DEFAULT_TICK_PERIOD_MS};
use serde::{Deserialize, Serialize};
use sim_protocol::Tick;
use std::path::Path;
use std::time::Duration;

/// Configuration for the SimulationClock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Tick period in milliseconds (default: 100ms)
    pub tick_period_ms: u64,

    /// Delay between sending a tick to the Feeder and to the Scheduler, in milliseconds
    pub feeder_delay_ms: u64,

    /// First tick value the clock emits
    pub initial_tick: Tick,

    /// Monitoring configuration
    pub monitoring: MonitoringConfig,
}

/// Monitoring and observability configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Enable periodic metrics log lines
    pub emit_metrics: bool,

    /// Ticks between metrics log lines
    pub metrics_interval_ticks: u64,

    /// Number of cycle durations kept for averages
    pub history_size: usize,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
            feeder_delay_ms: DEFAULT_FEEDER_DELAY_MS,
            initial_tick: 0,
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self { emit_metrics: true, metrics_interval_ticks: DEFAULT_METRICS_INTERVAL_TICKS, history_size: 1000 }
    }
}

impl ClockConfig {
    /// Get tick period as Duration
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Get feeder-to-scheduler delay as Duration
    pub fn feeder_delay(&self) -> Duration {
        Duration::from_millis(self.feeder_delay_ms)
    }

    /// Reject settings the cycle cannot honour
    pub fn validate(&self) -> Result<(), ClockError> {
        if self.tick_period_ms == 0 {
            return Err(ClockError::Config("tick_period_ms must be greater than zero".to_string()));
        }
        if self.feeder_delay_ms >= self.tick_period_ms {
            return Err(ClockError::Config(format!(
                "feeder_delay_ms ({}) must be shorter than tick_period_ms ({})",
                self.feeder_delay_ms, self.tick_period_ms
            )));
        }
        if self.monitoring.history_size == 0 {
            return Err(ClockError::Config("monitoring.history_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClockError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClockError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: ClockConfig = toml::from_str(&content)
            .map_err(|e| ClockError::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ClockError> {
        let content = toml::to_string_pretty(self).map_err(|e| ClockError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| ClockError::Config(format!("failed to write config: {e}")))?;
        Ok(())
    }
}
