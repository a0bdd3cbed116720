//! Cloneable client for the pipeline actor.
//!
//! Every call is a message to the single task that owns the
//! `CommandPipeline`, so submissions and reads are applied one at a time in
//! arrival order.

use skyguard_core::{Command, CommandStatus, PipelineStats, SubmitOutcome};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("pipeline actor is not running")]
    Closed,
}

/// Messages understood by the pipeline loop.
#[derive(Debug)]
pub enum PipelineRequest {
    Submit {
        command: Command,
        reply: oneshot::Sender<SubmitOutcome>,
    },
    QueueLength {
        reply: oneshot::Sender<usize>,
    },
    Queued {
        reply: oneshot::Sender<Vec<Command>>,
    },
    History {
        limit: usize,
        reply: oneshot::Sender<Vec<Command>>,
    },
    StatusOf {
        command_id: String,
        reply: oneshot::Sender<Option<CommandStatus>>,
    },
    NextForDrone {
        drone_id: String,
        reply: oneshot::Sender<Option<Command>>,
    },
    Acknowledge {
        command_id: String,
        reply: oneshot::Sender<bool>,
    },
    Stats {
        reply: oneshot::Sender<PipelineStats>,
    },
}

#[derive(Debug, Clone)]
pub struct PipelineHandle {
    tx: mpsc::Sender<PipelineRequest>,
}

impl PipelineHandle {
    pub fn new(tx: mpsc::Sender<PipelineRequest>) -> Self {
        Self { tx }
    }

    /// Submit a command. Returns `true` only if it completed; a stopped actor
    /// counts as a failure.
    pub async fn submit(&self, command: Command) -> bool {
        let command_id = command.command_id.clone();
        match self.submit_with_outcome(command).await {
            Ok(outcome) => outcome == SubmitOutcome::Completed,
            Err(err) => {
                tracing::error!("Command {} not submitted: {}", command_id, err);
                false
            }
        }
    }

    pub async fn submit_with_outcome(&self, command: Command) -> Result<SubmitOutcome, ServiceError> {
        self.request(|reply| PipelineRequest::Submit { command, reply })
            .await
    }

    pub async fn queue_length(&self) -> Result<usize, ServiceError> {
        self.request(|reply| PipelineRequest::QueueLength { reply })
            .await
    }

    pub async fn queued(&self) -> Result<Vec<Command>, ServiceError> {
        self.request(|reply| PipelineRequest::Queued { reply }).await
    }

    pub async fn history(&self, limit: usize) -> Result<Vec<Command>, ServiceError> {
        self.request(|reply| PipelineRequest::History { limit, reply })
            .await
    }

    pub async fn status_of(&self, command_id: &str) -> Result<Option<CommandStatus>, ServiceError> {
        let command_id = command_id.to_string();
        self.request(|reply| PipelineRequest::StatusOf { command_id, reply })
            .await
    }

    pub async fn next_for_drone(&self, drone_id: &str) -> Result<Option<Command>, ServiceError> {
        let drone_id = drone_id.to_string();
        self.request(|reply| PipelineRequest::NextForDrone { drone_id, reply })
            .await
    }

    pub async fn acknowledge(&self, command_id: &str) -> Result<bool, ServiceError> {
        let command_id = command_id.to_string();
        self.request(|reply| PipelineRequest::Acknowledge { command_id, reply })
            .await
    }

    pub async fn stats(&self) -> Result<PipelineStats, ServiceError> {
        self.request(|reply| PipelineRequest::Stats { reply }).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> PipelineRequest,
    ) -> Result<T, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| ServiceError::Closed)?;
        reply_rx.await.map_err(|_| ServiceError::Closed)
    }
}
