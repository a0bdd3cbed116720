//! Pipeline actor loop.
//!
//! Owns the `CommandPipeline` and serves `PipelineRequest`s one at a time.

use skyguard_core::CommandPipeline;
use tokio::sync::{broadcast, mpsc};

use crate::handle::PipelineRequest;

/// Runs until shutdown is signalled or every handle is dropped, then hands
/// the pipeline back so callers can inspect its final state.
pub async fn run_pipeline_loop(
    mut pipeline: CommandPipeline,
    mut rx: mpsc::Receiver<PipelineRequest>,
    mut shutdown: broadcast::Receiver<()>,
) -> CommandPipeline {
    tracing::info!("Pipeline loop started");

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Pipeline loop shutting down");
                break;
            }
            maybe_request = rx.recv() => {
                match maybe_request {
                    Some(request) => handle_request(&mut pipeline, request).await,
                    None => {
                        tracing::info!("Pipeline request channel closed");
                        break;
                    }
                }
            }
        }
    }

    let stats = pipeline.stats();
    tracing::info!(
        "Pipeline loop stopped after {} submissions ({} completed, {} rejected, {} failed)",
        stats.submitted,
        stats.completed,
        stats.rejected(),
        stats.failed
    );
    pipeline
}

async fn handle_request(pipeline: &mut CommandPipeline, request: PipelineRequest) {
    // A caller that gave up on its reply is not an error for the actor.
    match request {
        PipelineRequest::Submit { command, reply } => {
            let outcome = pipeline.submit_with_outcome(command).await;
            let _ = reply.send(outcome);
        }
        PipelineRequest::QueueLength { reply } => {
            let _ = reply.send(pipeline.queue_length());
        }
        PipelineRequest::Queued { reply } => {
            let _ = reply.send(pipeline.queued());
        }
        PipelineRequest::History { limit, reply } => {
            let _ = reply.send(pipeline.history(limit));
        }
        PipelineRequest::StatusOf { command_id, reply } => {
            let _ = reply.send(pipeline.status_of(&command_id));
        }
        PipelineRequest::NextForDrone { drone_id, reply } => {
            let _ = reply.send(pipeline.next_for_drone(&drone_id));
        }
        PipelineRequest::Acknowledge { command_id, reply } => {
            let _ = reply.send(pipeline.acknowledge(&command_id));
        }
        PipelineRequest::Stats { reply } => {
            let _ = reply.send(pipeline.stats());
        }
    }
}
