//! SkyGuard service: composes a `CommandPipeline` from configuration and runs
//! it behind a serialized-access actor.

pub mod config;
pub mod events;
pub mod handle;
pub mod loops;
pub mod telemetry;

use std::sync::Arc;

use skyguard_core::{
    AcceptAllParameters, CommandPipeline, FanoutSink, ParameterValidator, SecurityEvent,
    SecurityEventSink, StandardParameterValidator, TracingSink,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

pub use config::{Config, ConfigError};
pub use events::BroadcastSink;
pub use handle::{PipelineHandle, PipelineRequest, ServiceError};

/// Pipeline wired from configuration. Events go to the tracing log and to
/// `events`.
pub fn build_pipeline(config: &Config, events: &BroadcastSink) -> CommandPipeline {
    let validator: Arc<dyn ParameterValidator> = if config.strict_parameters {
        Arc::new(StandardParameterValidator::new(config.parameter_rules()))
    } else {
        tracing::warn!("Strict parameter validation disabled");
        Arc::new(AcceptAllParameters)
    };
    let sink: Arc<dyn SecurityEventSink> = Arc::new(
        FanoutSink::new()
            .with(Arc::new(TracingSink))
            .with(Arc::new(events.clone())),
    );

    CommandPipeline::new(config.pipeline_config())
        .with_validator(validator)
        .with_sink(sink)
}

/// A running pipeline actor.
pub struct Service {
    handle: PipelineHandle,
    events: BroadcastSink,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<CommandPipeline>,
}

impl Service {
    /// Validate `config`, build the pipeline and spawn its loop on the
    /// current runtime.
    pub fn start(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let events = BroadcastSink::new(config.event_buffer);
        let pipeline = build_pipeline(config, &events);
        Ok(Self::spawn(pipeline, config.channel_capacity, events))
    }

    /// Spawn a loop around an already composed pipeline.
    pub fn spawn(pipeline: CommandPipeline, channel_capacity: usize, events: BroadcastSink) -> Self {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(loops::pipeline_loop::run_pipeline_loop(
            pipeline,
            rx,
            shutdown_rx,
        ));

        Self {
            handle: PipelineHandle::new(tx),
            events,
            shutdown_tx,
            task,
        }
    }

    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SecurityEvent> {
        self.events.subscribe()
    }

    /// Stop the loop and return the pipeline in its final state.
    pub async fn shutdown(self) -> anyhow::Result<CommandPipeline> {
        let _ = self.shutdown_tx.send(());
        let pipeline = self.task.await?;
        Ok(pipeline)
    }
}
