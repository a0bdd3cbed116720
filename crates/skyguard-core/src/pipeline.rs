//! Command authorization pipeline.
//!
//! `submit` runs a command through fixed stages:
//!
//! 1. validation (structure, staleness, signature, parameters, source)
//! 2. threat threshold
//! 3. role authorization
//! 4. enqueue (CRITICAL to the head)
//! 5. execution
//! 6. error handling for faults at any stage
//! 7. history update for every command that reached execution
//!
//! Stages 1-3 reject without touching the queue or history; those outcomes
//! are visible only through the security event sink. `submit` never returns
//! an error: every failure becomes `false`.
//!
//! The pipeline holds no locks. Callers that share it across tasks must
//! serialize access (see the service crate's actor).

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::authorization;
use crate::events::{SecurityEvent, SecurityEventSink, TracingSink};
use crate::executor::{CommandExecutor, ExecutionError, LoggingExecutor};
use crate::history::{CommandHistory, DEFAULT_HISTORY_CAPACITY};
use crate::models::{Command, CommandStatus};
use crate::queue::CommandQueue;
use crate::signature::{verify_command, AcceptAllSignatures, SignatureVerifier};
use crate::validation::{self, ParameterValidator, StandardParameterValidator, ValidationReport};

/// Number of entries a history view shows when the caller has no preference.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Tunables for the pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Commands older than this are stale
    pub max_command_age_ms: i64,
    /// Scores strictly above this are rejected as threats
    pub threat_threshold: f64,
    /// Scores strictly above this also request an emergency response
    pub critical_threat_threshold: f64,
    pub history_capacity: usize,
}

impl PipelineConfig {
    /// A command is stale only when strictly older than the window.
    pub fn is_stale(&self, age_ms: i64) -> bool {
        age_ms > self.max_command_age_ms
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_command_age_ms: 5_000,
            threat_threshold: 0.7,
            critical_threat_threshold: 0.9,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Faults that escape the normal stage logic.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} panicked: {message}")]
    CollaboratorPanic { stage: &'static str, message: String },
}

/// Where a rejected command was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionStage {
    Validation,
    Threat,
    Authorization,
}

/// Result of one submission, before it is collapsed to a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "stage")]
pub enum SubmitOutcome {
    Completed,
    Failed,
    Rejected(RejectionStage),
}

/// Coarse threat classification derived from a threat score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

impl ThreatLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            ThreatLevel::Low
        } else if score < 0.7 {
            ThreatLevel::Medium
        } else {
            ThreatLevel::High
        }
    }
}

/// Running counters for monitoring panels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected_validation: u64,
    pub rejected_threat: u64,
    pub rejected_authorization: u64,
    pub security_events: u64,
    /// Threat score of the most recent validation
    pub last_threat_score: f64,
    pub total_processing_ms: f64,
}

impl PipelineStats {
    pub fn rejected(&self) -> u64 {
        self.rejected_validation + self.rejected_threat + self.rejected_authorization
    }

    /// Share of submissions that passed every check, in percent.
    pub fn authorized_percent(&self) -> f64 {
        if self.submitted == 0 {
            return 0.0;
        }
        let authorized = self.submitted - self.rejected();
        authorized as f64 / self.submitted as f64 * 100.0
    }

    pub fn rejected_percent(&self) -> f64 {
        if self.submitted == 0 {
            return 0.0;
        }
        self.rejected() as f64 / self.submitted as f64 * 100.0
    }

    pub fn average_processing_ms(&self) -> f64 {
        if self.submitted == 0 {
            return 0.0;
        }
        self.total_processing_ms / self.submitted as f64
    }

    pub fn threat_level(&self) -> ThreatLevel {
        ThreatLevel::from_score(self.last_threat_score)
    }

    fn record(&mut self, outcome: SubmitOutcome, elapsed_ms: f64) {
        self.submitted += 1;
        self.total_processing_ms += elapsed_ms;
        match outcome {
            SubmitOutcome::Completed => self.completed += 1,
            SubmitOutcome::Failed => self.failed += 1,
            SubmitOutcome::Rejected(RejectionStage::Validation) => self.rejected_validation += 1,
            SubmitOutcome::Rejected(RejectionStage::Threat) => self.rejected_threat += 1,
            SubmitOutcome::Rejected(RejectionStage::Authorization) => {
                self.rejected_authorization += 1
            }
        }
    }
}

/// The command authorization pipeline. Owns its queue and history.
pub struct CommandPipeline {
    config: PipelineConfig,
    verifier: Arc<dyn SignatureVerifier>,
    validator: Arc<dyn ParameterValidator>,
    executor: Arc<dyn CommandExecutor>,
    sink: Arc<dyn SecurityEventSink>,
    queue: CommandQueue,
    history: CommandHistory,
    stats: PipelineStats,
}

impl Default for CommandPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl CommandPipeline {
    /// Pipeline with the stand-in collaborators: every signature accepted,
    /// standard parameter bounds, logging executor, tracing sink.
    pub fn new(config: PipelineConfig) -> Self {
        let history = CommandHistory::with_capacity(config.history_capacity);
        Self {
            config,
            verifier: Arc::new(AcceptAllSignatures),
            validator: Arc::new(StandardParameterValidator::default()),
            executor: Arc::new(LoggingExecutor),
            sink: Arc::new(TracingSink),
            queue: CommandQueue::new(),
            history,
            stats: PipelineStats::default(),
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ParameterValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn SecurityEventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `command` through every stage. Returns `true` only if it completed.
    pub async fn submit(&mut self, command: Command) -> bool {
        self.submit_with_outcome(command).await == SubmitOutcome::Completed
    }

    /// Same as [`submit`](Self::submit) but reports where the command ended.
    pub async fn submit_with_outcome(&mut self, mut command: Command) -> SubmitOutcome {
        let started = Instant::now();
        let outcome = match self.process(&mut command).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.handle_error(&mut command, &err.to_string());
                SubmitOutcome::Failed
            }
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.stats.record(outcome, elapsed_ms);
        tracing::debug!(
            "Command {} finished as {:?} in {:.2}ms",
            command.command_id,
            outcome,
            elapsed_ms
        );
        outcome
    }

    /// Commands admitted and not yet acknowledged. Nothing else drains the
    /// queue, so consumers must call [`acknowledge`](Self::acknowledge) for
    /// every command they deliver or it grows without bound.
    pub fn queue_length(&self) -> usize {
        self.queue.len()
    }

    /// Queued commands, head first.
    pub fn queued(&self) -> Vec<Command> {
        self.queue.snapshot()
    }

    /// Most recently recorded commands, newest first.
    pub fn history(&self, limit: usize) -> Vec<Command> {
        self.history.recent(limit)
    }

    pub fn status_of(&self, command_id: &str) -> Option<CommandStatus> {
        self.history.status_of(command_id)
    }

    /// Next queued command for a drone, without removing it.
    pub fn next_for_drone(&self, drone_id: &str) -> Option<Command> {
        self.queue.peek_for_drone(drone_id)
    }

    /// Drop a delivered command from the queue. This is the only way a
    /// command leaves it.
    pub fn acknowledge(&mut self, command_id: &str) -> bool {
        let found = self.queue.acknowledge(command_id);
        if found {
            tracing::info!("Command {} acknowledged", command_id);
        }
        found
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats.clone()
    }

    async fn process(&mut self, command: &mut Command) -> Result<SubmitOutcome, PipelineError> {
        let report = self.validate(command).await?;
        self.stats.last_threat_score = report.threat_score;

        if !report.is_valid() {
            command.status = CommandStatus::Rejected;
            self.emit(SecurityEvent::CommandValidationFailed {
                command: command.clone(),
                errors: report.errors,
                threat_score: report.threat_score,
            });
            return Ok(SubmitOutcome::Rejected(RejectionStage::Validation));
        }

        // Every weighted check also records an error, so a report that got
        // this far carries a zero score. Kept as a separate stage anyway.
        if let Some(event) = self.check_threat(command, &report) {
            command.status = CommandStatus::Rejected;
            self.emit(event);
            return Ok(SubmitOutcome::Rejected(RejectionStage::Threat));
        }

        if !authorization::is_authorized(command) {
            command.status = CommandStatus::Rejected;
            self.emit(SecurityEvent::UnauthorizedCommand {
                source: command.source.clone(),
                command: command.clone(),
            });
            return Ok(SubmitOutcome::Rejected(RejectionStage::Authorization));
        }

        command.status = CommandStatus::Validated;
        self.queue.enqueue(command.clone());
        tracing::info!(
            "Command {} queued for drone {} (queue length {})",
            command.command_id,
            command.target_drone_id,
            self.queue.len()
        );

        let outcome = self.execute(command).await;
        self.history.record(command.clone());
        Ok(outcome)
    }

    /// Stage 1. Runs every check and accumulates errors and threat score.
    pub async fn validate(&self, command: &Command) -> Result<ValidationReport, PipelineError> {
        let mut report = ValidationReport::default();

        if command.command_id.trim().is_empty()
            || command.payload.is_none()
            || command.signature.is_empty()
        {
            report.fail(validation::MISSING_FIELDS);
        }

        let age_ms = command.age_ms(Utc::now().timestamp_millis());
        if self.config.is_stale(age_ms) {
            report.flag(validation::TIMESTAMP_TOO_OLD, validation::STALE_WEIGHT);
        }

        let verified = AssertUnwindSafe(verify_command(self.verifier.as_ref(), command))
            .catch_unwind()
            .await
            .map_err(|panic| PipelineError::CollaboratorPanic {
                stage: "signature verification",
                message: panic_message(panic),
            })?;
        if !verified {
            report.flag(validation::INVALID_SIGNATURE, validation::SIGNATURE_WEIGHT);
        }

        // Without a payload there is nothing to dispatch on.
        let params_ok = match &command.payload {
            Some(payload) => std::panic::catch_unwind(AssertUnwindSafe(|| {
                validation::validate_parameters(self.validator.as_ref(), payload)
            }))
            .map_err(|panic| PipelineError::CollaboratorPanic {
                stage: "parameter validation",
                message: panic_message(panic),
            })?,
            None => false,
        };
        if !params_ok {
            report.flag(validation::INVALID_PARAMETERS, validation::PARAMETER_WEIGHT);
        }

        if !validation::validate_source(command.source.as_ref()) {
            report.flag(validation::INVALID_SOURCE, validation::SOURCE_WEIGHT);
        }

        Ok(report)
    }

    /// Stage 2. Returns the event to emit if the score exceeds the threshold.
    pub fn check_threat(&self, command: &Command, report: &ValidationReport) -> Option<SecurityEvent> {
        if report.threat_score <= self.config.threat_threshold {
            return None;
        }
        let critical = report.threat_score > self.config.critical_threat_threshold;
        Some(SecurityEvent::ThreatDetected {
            command: command.clone(),
            threat_score: report.threat_score,
            critical,
            timestamp: Utc::now(),
        })
    }

    /// Stage 5.
    async fn execute(&mut self, command: &mut Command) -> SubmitOutcome {
        command.status = CommandStatus::Executing;

        let result = AssertUnwindSafe(self.executor.execute(command))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ExecutionError::Panicked(panic_message(panic))));

        match result {
            Ok(()) => {
                command.status = CommandStatus::Completed;
                tracing::info!("Command {} completed", command.command_id);
                SubmitOutcome::Completed
            }
            Err(err) => {
                self.handle_error(command, &err.to_string());
                SubmitOutcome::Failed
            }
        }
    }

    /// Stage 6.
    fn handle_error(&mut self, command: &mut Command, error: &str) {
        command.status = CommandStatus::Failed;
        self.emit(SecurityEvent::CommandError {
            command: command.clone(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn emit(&mut self, event: SecurityEvent) {
        self.stats.security_events += 1;
        let sink = self.sink.as_ref();
        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| sink.record(&event))) {
            tracing::error!(
                event = event.kind().as_str(),
                command_id = %event.command().command_id,
                "Security event sink panicked: {}",
                panic_message(panic)
            );
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
