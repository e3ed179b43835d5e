//! Network and transport configuration shared by all components

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default port of the Clock control listener
pub const DEFAULT_CLOCK_PORT: u16 = 4000;

/// Default port of the Task Feeder listener
pub const DEFAULT_FEEDER_PORT: u16 = 4001;

/// Default port of the Scheduler Engine listener
pub const DEFAULT_SCHEDULER_PORT: u16 = 4002;

/// Where each component listens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host address shared by all three listeners
    pub host: String,

    /// Clock control-plane port
    pub clock_port: u16,

    /// Task Feeder port
    pub feeder_port: u16,

    /// Scheduler Engine port
    pub scheduler_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            clock_port: DEFAULT_CLOCK_PORT,
            feeder_port: DEFAULT_FEEDER_PORT,
            scheduler_port: DEFAULT_SCHEDULER_PORT,
        }
    }
}

impl NetworkConfig {
    pub fn clock_addr(&self) -> String {
        format!("{}:{}", self.host, self.clock_port)
    }

    pub fn feeder_addr(&self) -> String {
        format!("{}:{}", self.host, self.feeder_port)
    }

    pub fn scheduler_addr(&self) -> String {
        format!("{}:{}", self.host, self.scheduler_port)
    }

    /// Ports must be distinct unless left to the OS (port 0)
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }

        let ports = [self.clock_port, self.feeder_port, self.scheduler_port];
        for (i, a) in ports.iter().enumerate() {
            for b in &ports[i + 1..] {
                if *a != 0 && a == b {
                    return Err(format!("port {a} is assigned to more than one component"));
                }
            }
        }
        Ok(())
    }
}

/// Per-connection limits for the fire-and-forget transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Connect + write budget for one outbound message, in milliseconds
    pub send_timeout_ms: u64,

    /// Budget for reading one inbound payload, in milliseconds
    pub read_timeout_ms: u64,

    /// Largest accepted inbound payload
    pub max_payload_bytes: usize,

    /// Capacity of the channel between a listener and its state-owning loop
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { send_timeout_ms: 500, read_timeout_ms: 500, max_payload_bytes: 4096, channel_capacity: 1024 }
    }
}

impl TransportConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// How the Scheduler Engine orders a tick against the task arrivals for that tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickOrdering {
    /// Execute a tick only after the Feeder reports its arrivals for that tick are settled
    #[default]
    Barrier,

    /// Execute a tick on receipt; ordering relies on the Clock's feeder delay
    Delay,
}

impl TickOrdering {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickOrdering::Barrier => "barrier",
            TickOrdering::Delay => "delay",
        }
    }
}

impl fmt::Display for TickOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TickOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "barrier" => Ok(TickOrdering::Barrier),
            "delay" => Ok(TickOrdering::Delay),
            other => Err(format!("unknown tick ordering '{other}' (expected barrier or delay)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.feeder_addr(), "127.0.0.1:4001");
        assert_eq!(config.scheduler_addr(), "127.0.0.1:4002");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_ports_rejected() {
        let config = NetworkConfig { feeder_port: 4002, ..Default::default() };
        assert!(config.validate().is_err());

        let ephemeral = NetworkConfig { clock_port: 0, feeder_port: 0, scheduler_port: 0, ..Default::default() };
        assert!(ephemeral.validate().is_ok());
    }

    #[test]
    fn test_tick_ordering_parse() {
        assert_eq!("BARRIER".parse::<TickOrdering>().unwrap(), TickOrdering::Barrier);
        assert_eq!("delay".parse::<TickOrdering>().unwrap(), TickOrdering::Delay);
        assert!("strict".parse::<TickOrdering>().is_err());
    }
}
