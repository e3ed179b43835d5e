//! Service configuration management
//!
//! Layers, lowest first: built-in defaults, an optional TOML file, then environment variables
//! prefixed `SCHED_SIM` with `__` between path segments, e.g.
//! `SCHED_SIM__NETWORK__SCHEDULER_PORT=5002`. A `.env` file in the working directory is read
//! into the environment first. CLI flags are applied on top by the binary.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use scheduler_engine::SchedulerConfig;
use sim_protocol::{NetworkConfig, TaskSpec, TickOrdering, TransportConfig};
use simulation_clock::ClockConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SCHED_SIM";

/// Main service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener addresses of the three components
    pub network: NetworkConfig,

    /// Per-message transport limits
    pub transport: TransportConfig,

    /// How the Scheduler orders ticks against task arrivals
    pub ordering: TickOrdering,

    /// SimulationClock configuration
    pub clock: ClockConfig,

    /// Task Feeder settings
    pub feeder: FeederSettings,

    /// Scheduler Engine configuration
    pub scheduler: SchedulerConfig,

    /// Service-level settings
    pub service: ServiceSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Task Feeder settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeederSettings {
    /// Task file to load; the CLI argument takes precedence
    pub tasks_file: Option<PathBuf>,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// How long each component gets to stop once shutdown is signalled
    pub shutdown_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub level: String,

    /// Log format (compact, pretty, json)
    pub format: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { shutdown_timeout_secs: 5 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "compact".to_string() }
    }
}

impl ServiceConfig {
    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.service.shutdown_timeout_secs)
    }

    /// Check every section; port 0 is accepted (the OS picks a port)
    pub fn validate(&self) -> Result<()> {
        self.network.validate().map_err(|e| anyhow!("Invalid network configuration: {e}"))?;
        self.clock.validate().context("Invalid clock configuration")?;
        self.scheduler.validate().context("Invalid scheduler configuration")?;

        if self.transport.max_payload_bytes == 0 || self.transport.channel_capacity == 0 {
            bail!("transport.max_payload_bytes and transport.channel_capacity must be non-zero");
        }
        if self.transport.send_timeout_ms == 0 || self.transport.read_timeout_ms == 0 {
            bail!("transport timeouts must be non-zero");
        }

        match self.logging.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => bail!("Invalid log level: {}", self.logging.level),
        }
        match self.logging.format.as_str() {
            "compact" | "pretty" | "json" => {}
            _ => bail!("Invalid log format: {}", self.logging.format),
        }

        Ok(())
    }

    /// Components running in separate processes must agree on fixed ports
    pub fn require_fixed_ports(&self) -> Result<()> {
        let network = &self.network;
        if network.clock_port == 0 || network.feeder_port == 0 || network.scheduler_port == 0 {
            bail!("Every port must be set explicitly when components run in separate processes");
        }
        Ok(())
    }

    /// The Feeder releases a task only on the tick equal to its arrival time, so a task due
    /// before the Clock's first tick would never be emitted and the run would never finish
    pub fn validate_tasks(&self, tasks: &[TaskSpec]) -> Result<()> {
        let first_tick = self.clock.initial_tick;
        let earliest = tasks.iter().min_by_key(|task| task.arrival_time);
        if let Some(early) = earliest.filter(|task| task.arrival_time < first_tick) {
            bail!(
                "Task {} arrives at tick {} but the clock starts at tick {}",
                early.id,
                early.arrival_time,
                first_tick
            );
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Load configuration from defaults, an optional file and the environment
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    dotenv::dotenv().ok();
    load_layered(path, None)
}

/// Same layering with an explicit variable set standing in for the process environment
fn load_layered(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<ServiceConfig> {
    let mut builder = ::config::Config::builder();

    if let Some(path) = path {
        if !path.exists() {
            bail!("Configuration file not found: {}", path.display());
        }
        tracing::debug!("Loading configuration from file: {:?}", path);
        builder = builder.add_source(::config::File::from(path.to_path_buf()));
    }

    let config: ServiceConfig = builder
        .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__").source(env))
        .build()
        .context("Failed to assemble configuration sources")?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler_engine::{Algorithm, ReportFormat};
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServiceConfig::default();

        assert!(config.validate().is_ok());
        assert!(config.require_fixed_ports().is_ok());
        assert_eq!(config.network.clock_port, 4000);
        assert_eq!(config.network.feeder_port, 4001);
        assert_eq!(config.network.scheduler_port, 4002);
        assert_eq!(config.clock.tick_period_ms, 100);
        assert_eq!(config.clock.feeder_delay_ms, 5);
        assert_eq!(config.ordering, TickOrdering::Barrier);
        assert_eq!(config.scheduler.report.format, ReportFormat::Text);
    }

    #[test]
    fn test_file_layer() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "ordering = \"delay\"").unwrap();
        writeln!(file, "[network]").unwrap();
        writeln!(file, "scheduler_port = 6002").unwrap();
        writeln!(file, "[scheduler]").unwrap();
        writeln!(file, "algorithm = \"rr\"").unwrap();
        writeln!(file, "quantum = 2").unwrap();
        writeln!(file, "[clock]").unwrap();
        writeln!(file, "tick_period_ms = 20").unwrap();

        let config = load_layered(Some(file.path()), Some(HashMap::new())).unwrap();
        assert_eq!(config.ordering, TickOrdering::Delay);
        assert_eq!(config.network.scheduler_port, 6002);
        assert_eq!(config.network.clock_port, 4000);
        assert_eq!(config.scheduler.quantum, 2);
        assert_eq!(config.clock.tick_period_ms, 20);
        assert_eq!(config.clock.feeder_delay_ms, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scheduler]").unwrap();
        writeln!(file, "algorithm = \"rr\"").unwrap();

        let env = HashMap::from([
            ("SCHED_SIM__SCHEDULER__ALGORITHM".to_string(), "srtf".to_string()),
            ("SCHED_SIM__NETWORK__SCHEDULER_PORT".to_string(), "5002".to_string()),
            ("UNRELATED__SCHEDULER__QUANTUM".to_string(), "9".to_string()),
        ]);
        let config = load_layered(Some(file.path()), Some(env)).unwrap();

        assert_eq!(config.scheduler.algorithm, "srtf");
        assert_eq!(config.network.scheduler_port, 5002);
        assert_eq!(config.scheduler.quantum, 3);
    }

    #[test]
    fn test_tasks_before_first_tick_rejected() {
        let mut config = ServiceConfig::default();
        let tasks = vec![TaskSpec::new("A", 0, 1, 1), TaskSpec::new("B", 3, 1, 1)];
        assert!(config.validate_tasks(&tasks).is_ok());

        config.clock.initial_tick = 2;
        let err = config.validate_tasks(&tasks).unwrap_err();
        assert!(err.to_string().contains("Task A arrives at tick 0"));

        config.clock.initial_tick = 3;
        assert!(config.validate_tasks(&tasks[1..]).is_ok());
    }

    #[test]
    fn test_demo_configuration_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/scheduler-sim.toml");
        let config = load_layered(Some(&path), Some(HashMap::new())).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.algorithm().unwrap(), Algorithm::RoundRobin { quantum: 2 });
        assert_eq!(config.feeder.tasks_file, Some(PathBuf::from("demos/tasks.txt")));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = ServiceConfig::default();
        config.network.feeder_port = config.network.scheduler_port;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.clock.feeder_delay_ms = config.clock.tick_period_ms;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.scheduler.algorithm = "lottery".to_string();
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.network.clock_port = 0;
        assert!(config.validate().is_ok());
        assert!(config.require_fixed_ports().is_err());
    }

    #[test]
    fn test_toml_rendering_reloads() {
        let config = ServiceConfig::default();
        let rendered = config.to_toml().unwrap();

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(rendered.as_bytes()).unwrap();

        assert_eq!(load_layered(Some(file.path()), Some(HashMap::new())).unwrap(), config);
    }
}
