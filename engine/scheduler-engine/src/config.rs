//! Configuration for the Scheduler Engine

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;
use crate::error::SchedulerError;
use crate::{DEFAULT_AGING_PERIOD, DEFAULT_QUANTUM};

/// Configuration for the Scheduler Engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Algorithm key: fcfs, rr, sjf, srtf, prioc, priop or priod
    pub algorithm: String,

    /// Round-Robin quantum in ticks
    pub quantum: u64,

    /// Ticks between aging steps for the dynamic-priority policy
    pub aging_period: u64,

    /// Where and how the final report is written
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub directory: PathBuf,
    pub format: ReportFormat,
}

/// Report rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportFormat::Text => "text",
            ReportFormat::Json => "json",
        })
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{other}' (expected text or json)")),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default().key().to_string(),
            quantum: DEFAULT_QUANTUM,
            aging_period: DEFAULT_AGING_PERIOD,
            report: ReportConfig::default(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { directory: PathBuf::from("."), format: ReportFormat::Text }
    }
}

impl SchedulerConfig {
    /// Resolve the configured algorithm with its parameters
    pub fn algorithm(&self) -> Result<Algorithm, SchedulerError> {
        Algorithm::from_key(&self.algorithm, self.quantum, self.aging_period)
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.quantum == 0 {
            return Err(SchedulerError::Config("quantum must be at least 1".to_string()));
        }
        if self.aging_period == 0 {
            return Err(SchedulerError::Config("aging_period must be at least 1".to_string()));
        }
        self.algorithm().map(|_| ())
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SchedulerError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config: SchedulerConfig = toml::from_str(&content)
            .map_err(|e| SchedulerError::Config(format!("failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), SchedulerError> {
        let content = toml::to_string_pretty(self).map_err(|e| SchedulerError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| SchedulerError::Config(format!("failed to write config: {e}")))?;
        Ok(())
    }
}
