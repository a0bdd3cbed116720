pub mod authorization;
pub mod events;
pub mod executor;
pub mod history;
pub mod models;
pub mod pipeline;
pub mod queue;
pub mod rules;
pub mod signature;
pub mod validation;

pub use events::{
    FanoutSink, RecordingSink, SecurityEvent, SecurityEventKind, SecurityEventSink, TracingSink,
};
pub use executor::{CommandExecutor, ExecutionError, LoggingExecutor};
pub use history::CommandHistory;
pub use models::{
    Command, CommandPayload, CommandPriority, CommandSource, CommandStatus, CommandType,
    EmergencyAction, EmergencyParams, MovementParams, SecurityParams, SensorKind, SensorParams,
    SourceType, SystemParams, Waypoint,
};
pub use pipeline::{
    CommandPipeline, PipelineConfig, PipelineError, PipelineStats, RejectionStage, SubmitOutcome,
    ThreatLevel, DEFAULT_HISTORY_LIMIT,
};
pub use queue::CommandQueue;
pub use rules::ParameterRules;
pub use signature::{AcceptAllSignatures, SignatureVerifier, StaticVerifier, VerifierError};
pub use validation::{
    AcceptAllParameters, ParameterValidator, StandardParameterValidator, ValidationReport,
};
