//! Demo Scenario - one operator's session against the command pipeline.
//!
//! Walks every path a command can take:
//!
//! 1. ADMITTED: valid movement and sensor commands complete
//! 2. VALIDATION: stale and unsigned commands are rejected
//! 3. AUTHORIZATION: SYSTEM and SECURITY commands need elevated roles
//! 4. CRITICAL: an emergency landing jumps to the head of the queue
//! 5. EXECUTION: a command to an unreachable drone is recorded as FAILED
//!
//! Usage:
//!   cargo run -p skyguard-cli --bin demo_scenario -- --operator-role OPERATOR

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use tokio::sync::broadcast::error::TryRecvError;

use skyguard_cli::{create_authorization_tour, DemoExecutor, Expectation};
use skyguard_core::{Command, PipelineStats, SubmitOutcome, DEFAULT_HISTORY_LIMIT};
use skyguard_service::{build_pipeline, telemetry, BroadcastSink, Config, Service};

#[derive(Parser, Debug)]
#[command(author, version, about = "Demo: drone command validation and authorization")]
struct Args {
    /// Role attached to every command source
    #[arg(long, default_value = "OPERATOR")]
    operator_role: String,

    /// Target drone
    #[arg(long, default_value = "DRONE001")]
    drone_id: String,

    /// Extra movement commands queued before the emergency
    #[arg(long, default_value_t = 3)]
    burst: usize,

    /// Print a single JSON report instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct StepReport {
    label: String,
    command_id: String,
    command_type: String,
    expected: Expectation,
    outcome: SubmitOutcome,
    as_expected: bool,
}

#[derive(Debug, Serialize)]
struct DemoReport {
    scenario: String,
    steps: Vec<StepReport>,
    history: Vec<Command>,
    queue: Vec<Command>,
    security_events: BTreeMap<&'static str, u64>,
    stats: PipelineStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env();
    telemetry::init_tracing(config.log_json)?;
    config.validate()?;

    let events = BroadcastSink::new(config.event_buffer);
    let pipeline =
        build_pipeline(&config, &events).with_executor(Arc::new(DemoExecutor::default()));
    let service = Service::spawn(pipeline, config.channel_capacity, events);
    let mut subscriber = service.subscribe();
    let handle = service.handle();

    let scenario = create_authorization_tour(&args.drone_id, &args.operator_role, args.burst);
    if !args.json {
        println!("=== {} ===", scenario.name);
    }

    let mut steps = Vec::with_capacity(scenario.steps.len());
    for step in scenario.steps {
        let command_id = step.command.command_id.clone();
        let command_type = step
            .command
            .command_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "UNTYPED".to_string());
        let outcome = handle.submit_with_outcome(step.command).await?;
        let as_expected = step.expect.matches(outcome);

        if !args.json {
            println!(
                "[{}] {:<28} {:<10} {:<40} -> {:?}",
                if as_expected { " OK " } else { "MISS" },
                step.label,
                command_type,
                command_id,
                outcome
            );
        }
        steps.push(StepReport {
            label: step.label,
            command_id,
            command_type,
            expected: step.expect,
            outcome,
            as_expected,
        });
    }

    let mut security_events: BTreeMap<&'static str, u64> = BTreeMap::new();
    loop {
        match subscriber.try_recv() {
            Ok(event) => *security_events.entry(event.kind().as_str()).or_insert(0) += 1,
            Err(TryRecvError::Lagged(missed)) => {
                tracing::warn!("Security event subscriber missed {} events", missed);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }

    let report = DemoReport {
        scenario: scenario.name,
        steps,
        history: handle.history(DEFAULT_HISTORY_LIMIT).await?,
        queue: handle.queued().await?,
        security_events,
        stats: handle.stats().await?,
    };
    service.shutdown().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }

    let misses = report.steps.iter().filter(|s| !s.as_expected).count();
    if misses > 0 {
        bail!("{} step(s) did not match their expected outcome", misses);
    }
    Ok(())
}

fn print_text(report: &DemoReport) {
    println!("\n--- history (newest first) ---");
    for command in &report.history {
        println!(
            "{:<40} {:<14} {:?}",
            command.command_id, command.target_drone_id, command.status
        );
    }

    println!("\n--- queue (head first) ---");
    for (position, command) in report.queue.iter().enumerate() {
        println!(
            "{:>3}. {:<40} {:<14} {:?}",
            position + 1,
            command.command_id,
            command.target_drone_id,
            command.priority
        );
    }

    println!("\n--- security events ---");
    for (kind, count) in &report.security_events {
        println!("{:<28} {}", kind, count);
    }

    let stats = &report.stats;
    println!("\n--- stats ---");
    println!("submitted         {}", stats.submitted);
    println!("completed         {}", stats.completed);
    println!("failed            {}", stats.failed);
    println!("rejected          {}", stats.rejected());
    println!("authorized        {:.1}%", stats.authorized_percent());
    println!("avg processing    {:.2}ms", stats.average_processing_ms());
    println!("threat level      {:?}", stats.threat_level());
}
