//! Command execution seam.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Command;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("Drone not reachable: {0}")]
    DroneUnreachable(String),

    #[error("Drone {drone_id} refused command: {reason}")]
    Rejected { drone_id: String, reason: String },

    #[error("Execution failed: {0}")]
    Failed(String),

    #[error("Executor panicked: {0}")]
    Panicked(String),
}

/// Performs the actual effect of a command against its target drone.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &Command) -> Result<(), ExecutionError>;
}

/// Logs the command and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingExecutor;

#[async_trait]
impl CommandExecutor for LoggingExecutor {
    async fn execute(&self, command: &Command) -> Result<(), ExecutionError> {
        tracing::info!(
            "Executing command {} on drone {}",
            command.command_id,
            command.target_drone_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommandPayload, CommandSource, MovementParams, SourceType};

    #[tokio::test]
    async fn test_logging_executor_succeeds() {
        let command = Command::new(
            "CMD-1",
            "DRONE001",
            CommandPayload::Movement(MovementParams::Land),
            CommandSource::new("op-1", SourceType::User, "USER"),
        );
        assert_eq!(LoggingExecutor.execute(&command).await, Ok(()));
    }

    #[test]
    fn test_error_messages() {
        let err = ExecutionError::Rejected {
            drone_id: "DRONE001".to_string(),
            reason: "low battery".to_string(),
        };
        assert_eq!(err.to_string(), "Drone DRONE001 refused command: low battery");
        assert_eq!(
            ExecutionError::DroneUnreachable("DRONE002".to_string()).to_string(),
            "Drone not reachable: DRONE002"
        );
    }
}
