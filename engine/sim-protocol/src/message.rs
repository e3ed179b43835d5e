//! Wire messages exchanged between the simulator components
//!
//! Every payload travels alone on its own connection, so there is no framing. Kinds are told
//! apart by content: an all-digit payload is a tick, the literal [`TERMINATION_TOKEN`] is the
//! stop command, and anything else must be a JSON record carrying a `type` discriminator.

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};
use crate::types::{TaskSpec, Tick};

/// Literal stop command the Scheduler Engine sends to the Clock
pub const TERMINATION_TOKEN: &str = "FIM";

/// Structured records sent by the Task Feeder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskEnvelope {
    /// A task whose arrival time equals the tick the Feeder just handled
    Task(TaskSpec),

    /// Every task has been pushed at least once
    AllTasksEmitted {
        /// Distinct tasks the Feeder attempted to send; absent from legacy senders
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_count: Option<usize>,
    },

    /// All task messages for `tick` have been written
    ArrivalsSettled { tick: Tick },
}

/// A decoded payload, whatever its direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Tick(Tick),
    Envelope(TaskEnvelope),
    Terminate,
}

impl Message {
    /// Decode a raw payload by sniffing its content
    pub fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::NonUtf8Payload)?;
        let text = text.trim();

        if text.is_empty() {
            return Err(ProtocolError::EmptyPayload);
        }

        if text.bytes().all(|b| b.is_ascii_digit()) {
            return text
                .parse::<Tick>()
                .map(Message::Tick)
                .map_err(|_| ProtocolError::InvalidTick(text.to_string()));
        }

        if text == TERMINATION_TOKEN {
            return Ok(Message::Terminate);
        }

        let envelope: TaskEnvelope = serde_json::from_str(text)?;
        if let TaskEnvelope::Task(spec) = &envelope {
            spec.validate()?;
        }
        Ok(Message::Envelope(envelope))
    }

    /// Encode into the payload written on the wire
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        match self {
            Message::Tick(tick) => Ok(tick.to_string().into_bytes()),
            Message::Terminate => Ok(TERMINATION_TOKEN.as_bytes().to_vec()),
            Message::Envelope(envelope) => Ok(serde_json::to_vec(envelope)?),
        }
    }

    /// Short label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Tick(_) => "tick",
            Message::Terminate => "terminate",
            Message::Envelope(TaskEnvelope::Task(_)) => "task",
            Message::Envelope(TaskEnvelope::AllTasksEmitted { .. }) => "all_tasks_emitted",
            Message::Envelope(TaskEnvelope::ArrivalsSettled { .. }) => "arrivals_settled",
        }
    }
}

impl From<TaskEnvelope> for Message {
    fn from(envelope: TaskEnvelope) -> Self {
        Message::Envelope(envelope)
    }
}
