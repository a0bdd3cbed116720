//! Security events emitted at pipeline decision points, and the sinks that
//! receive them.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::models::{Command, CommandSource};

/// One audit record. Each variant carries a snapshot of the command as it
/// stood when the decision was made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEvent {
    CommandValidationFailed {
        command: Command,
        errors: Vec<String>,
        threat_score: f64,
    },
    ThreatDetected {
        command: Command,
        threat_score: f64,
        /// Score crossed the critical threshold; emergency response hook.
        critical: bool,
        timestamp: DateTime<Utc>,
    },
    UnauthorizedCommand {
        command: Command,
        source: Option<CommandSource>,
    },
    CommandError {
        command: Command,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecurityEventKind {
    CommandValidationFailed,
    ThreatDetected,
    UnauthorizedCommand,
    CommandError,
}

impl SecurityEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityEventKind::CommandValidationFailed => "COMMAND_VALIDATION_FAILED",
            SecurityEventKind::ThreatDetected => "THREAT_DETECTED",
            SecurityEventKind::UnauthorizedCommand => "UNAUTHORIZED_COMMAND",
            SecurityEventKind::CommandError => "COMMAND_ERROR",
        }
    }
}

impl SecurityEvent {
    pub fn kind(&self) -> SecurityEventKind {
        match self {
            SecurityEvent::CommandValidationFailed { .. } => SecurityEventKind::CommandValidationFailed,
            SecurityEvent::ThreatDetected { .. } => SecurityEventKind::ThreatDetected,
            SecurityEvent::UnauthorizedCommand { .. } => SecurityEventKind::UnauthorizedCommand,
            SecurityEvent::CommandError { .. } => SecurityEventKind::CommandError,
        }
    }

    pub fn command(&self) -> &Command {
        match self {
            SecurityEvent::CommandValidationFailed { command, .. }
            | SecurityEvent::ThreatDetected { command, .. }
            | SecurityEvent::UnauthorizedCommand { command, .. }
            | SecurityEvent::CommandError { command, .. } => command,
        }
    }
}

/// Observer for security events. Called synchronously from the pipeline, so
/// implementations should not block.
pub trait SecurityEventSink: Send + Sync {
    fn record(&self, event: &SecurityEvent);
}

/// Writes events to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl SecurityEventSink for TracingSink {
    fn record(&self, event: &SecurityEvent) {
        let command = event.command();
        match event {
            SecurityEvent::CommandValidationFailed {
                errors,
                threat_score,
                ..
            } => {
                tracing::warn!(
                    event = event.kind().as_str(),
                    command_id = %command.command_id,
                    drone_id = %command.target_drone_id,
                    threat_score,
                    "Command failed validation: {}",
                    errors.join("; ")
                );
            }
            SecurityEvent::ThreatDetected {
                threat_score,
                critical: true,
                ..
            } => {
                tracing::error!(
                    event = event.kind().as_str(),
                    command_id = %command.command_id,
                    drone_id = %command.target_drone_id,
                    threat_score,
                    "Critical threat detected, emergency response required"
                );
            }
            SecurityEvent::ThreatDetected { threat_score, .. } => {
                tracing::warn!(
                    event = event.kind().as_str(),
                    command_id = %command.command_id,
                    drone_id = %command.target_drone_id,
                    threat_score,
                    "Threat detected"
                );
            }
            SecurityEvent::UnauthorizedCommand { source, .. } => {
                let (source_id, role) = source
                    .as_ref()
                    .map(|s| (s.id.as_str(), s.role.as_str()))
                    .unwrap_or(("<none>", "<none>"));
                tracing::warn!(
                    event = event.kind().as_str(),
                    command_id = %command.command_id,
                    source_id,
                    role,
                    "Unauthorized {} command",
                    command.command_type().map(|t| t.as_str()).unwrap_or("UNTYPED")
                );
            }
            SecurityEvent::CommandError { error, .. } => {
                tracing::error!(
                    event = event.kind().as_str(),
                    command_id = %command.command_id,
                    drone_id = %command.target_drone_id,
                    "Command processing error: {}",
                    error
                );
            }
        }
    }
}

/// Keeps every event in memory together with per-kind counters.
#[derive(Debug, Default)]
pub struct RecordingSink {
    counts: DashMap<SecurityEventKind, u64>,
    events: Mutex<Vec<SecurityEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: SecurityEventKind) -> u64 {
        self.counts.get(&kind).map(|entry| *entry.value()).unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|entry| *entry.value()).sum()
    }

    /// Copy of every recorded event, oldest first.
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn events_for(&self, command_id: &str) -> Vec<SecurityEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.command().command_id == command_id)
            .collect()
    }
}

impl SecurityEventSink for RecordingSink {
    fn record(&self, event: &SecurityEvent) {
        *self.counts.entry(event.kind()).or_insert(0) += 1;
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Forwards each event to every inner sink, in order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn SecurityEventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn SecurityEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl SecurityEventSink for FanoutSink {
    fn record(&self, event: &SecurityEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
