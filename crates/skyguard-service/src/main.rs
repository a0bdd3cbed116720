//! SkyGuard service - replays newline-delimited JSON commands from stdin
//! through the authorization pipeline.

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};

use skyguard_core::{Command, CommandStatus, SubmitOutcome};
use skyguard_service::{telemetry, Config, Service};

#[derive(Debug, Serialize)]
struct SubmissionLine {
    command_id: String,
    accepted: bool,
    outcome: SubmitOutcome,
    /// `None` when the command never reached history
    status: Option<CommandStatus>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    telemetry::init_tracing(config.log_json)?;
    config.validate().context("invalid SKYGUARD_* configuration")?;

    tracing::info!("Starting SkyGuard service...");

    let service = Service::start(&config)?;
    let handle = service.handle();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let command: Command = match serde_json::from_str(&line) {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!("Skipping line {}: not a command ({})", line_no, err);
                continue;
            }
        };

        let command_id = command.command_id.clone();
        let outcome = handle.submit_with_outcome(command).await?;
        let status = handle.status_of(&command_id).await?;
        let output = SubmissionLine {
            command_id,
            accepted: outcome == SubmitOutcome::Completed,
            outcome,
            status,
        };
        println!("{}", serde_json::to_string(&output)?);
    }

    let stats = handle.stats().await?;
    println!("{}", serde_json::to_string(&stats)?);

    service.shutdown().await?;
    Ok(())
}
