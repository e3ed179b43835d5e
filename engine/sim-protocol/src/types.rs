//! Core value types shared by every component

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ProtocolError, ProtocolResult};

/// Logical clock value; the only notion of time in the simulation
pub type Tick = u64;

/// Opaque, comparable task identity.
///
/// Task files and legacy senders use plain integers, so the wire form accepts either a JSON
/// number or a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => TaskId(n.to_string()),
            RawId::Text(s) => TaskId(s),
        })
    }
}

/// Immutable identity of a task as loaded from the task set and carried on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Task identity
    pub id: TaskId,

    /// Tick at which the task becomes eligible for the ready queue
    pub arrival_time: Tick,

    /// Total execution units required
    pub burst_time: u64,

    /// Smaller value = more urgent; never below 1
    pub priority: u32,
}

impl TaskSpec {
    pub fn new(id: impl Into<TaskId>, arrival_time: Tick, burst_time: u64, priority: u32) -> Self {
        Self { id: id.into(), arrival_time, burst_time, priority }
    }

    /// Check the invariants every component assumes of a task
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(ProtocolError::InvalidTask {
                id: self.id.to_string(),
                reason: "empty task id".to_string(),
            });
        }
        if self.burst_time == 0 {
            return Err(ProtocolError::InvalidTask {
                id: self.id.to_string(),
                reason: "burst_time must be greater than zero".to_string(),
            });
        }
        if self.priority < 1 {
            return Err(ProtocolError::InvalidTask {
                id: self.id.to_string(),
                reason: "priority must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
