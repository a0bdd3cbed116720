//! Pipeline actor behavior through `PipelineHandle`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use skyguard_core::{
    Command, CommandExecutor, CommandPayload, CommandPipeline, CommandPriority, CommandSource,
    CommandStatus, ExecutionError, MovementParams, SecurityEvent, SecurityEventKind,
    SecurityEventSink, SecurityParams, SourceType, SubmitOutcome, RejectionStage,
};
use skyguard_service::{BroadcastSink, Config, ConfigError, Service, ServiceError};
use uuid::Uuid;

fn movement(id: &str, drone_id: &str) -> Command {
    Command::new(
        id,
        drone_id,
        CommandPayload::Movement(MovementParams::Hold { duration_secs: 30 }),
        CommandSource::new("operator-1", SourceType::User, "OPERATOR"),
    )
    .with_signature("signed")
}

/// Fails every other command it sees.
#[derive(Default)]
struct FlakyExecutor {
    calls: AtomicUsize,
}

#[async_trait]
impl CommandExecutor for FlakyExecutor {
    async fn execute(&self, command: &Command) -> Result<(), ExecutionError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
            return Err(ExecutionError::DroneUnreachable(command.target_drone_id.clone()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_concurrent_submissions_are_serialized() {
    let service = Service::start(&Config::default()).unwrap();

    let mut tasks = Vec::new();
    for worker in 0..8 {
        let handle = service.handle();
        tasks.push(tokio::spawn(async move {
            let mut accepted = 0;
            for _ in 0..25 {
                let id = format!("CMD-{}", Uuid::new_v4());
                if handle.submit(movement(&id, &format!("DRONE{worker:03}"))).await {
                    accepted += 1;
                }
            }
            accepted
        }));
    }

    let mut accepted = 0;
    for task in tasks {
        accepted += task.await.unwrap();
    }

    let handle = service.handle();
    assert_eq!(accepted, 200);
    assert_eq!(handle.queue_length().await.unwrap(), 200);
    assert_eq!(handle.history(500).await.unwrap().len(), 200);

    let stats = handle.stats().await.unwrap();
    assert_eq!(stats.submitted, 200);
    assert_eq!(stats.completed, 200);
    assert_eq!(stats.authorized_percent(), 100.0);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_same_id_from_many_tasks_keeps_one_history_entry() {
    let service = Service::start(&Config::default()).unwrap();

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let handle = service.handle();
        tasks.push(tokio::spawn(async move {
            handle.submit(movement("CMD-SHARED", "DRONE001")).await
        }));
    }
    for task in tasks {
        assert!(task.await.unwrap());
    }

    let handle = service.handle();
    assert_eq!(handle.history(100).await.unwrap().len(), 1);
    assert_eq!(
        handle.status_of("CMD-SHARED").await.unwrap(),
        Some(CommandStatus::Completed)
    );

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_subscribers_see_rejections() {
    let service = Service::start(&Config::default()).unwrap();
    let mut events = service.subscribe();
    let handle = service.handle();

    let lockdown = Command::new(
        "CMD-LOCKDOWN",
        "DRONE001",
        CommandPayload::Security(SecurityParams::Lockdown { duration_secs: 600 }),
        CommandSource::new("operator-1", SourceType::User, "OPERATOR"),
    )
    .with_signature("signed");

    assert_eq!(
        handle.submit_with_outcome(lockdown).await.unwrap(),
        SubmitOutcome::Rejected(RejectionStage::Authorization)
    );

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind(), SecurityEventKind::UnauthorizedCommand);
    assert!(matches!(event, SecurityEvent::UnauthorizedCommand { .. }));
    assert_eq!(event.command().command_id, "CMD-LOCKDOWN");
    assert_eq!(handle.status_of("CMD-LOCKDOWN").await.unwrap(), None);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dispatch_through_handle() {
    let service = Service::start(&Config::default()).unwrap();
    let handle = service.handle();

    assert!(handle.submit(movement("CMD-A", "DRONE001")).await);
    assert!(handle.submit(movement("CMD-B", "DRONE002")).await);
    assert!(
        handle
            .submit(movement("CMD-C", "DRONE001").with_priority(CommandPriority::Critical))
            .await
    );

    let next = handle.next_for_drone("DRONE001").await.unwrap().unwrap();
    assert_eq!(next.command_id, "CMD-C");
    assert!(handle.acknowledge("CMD-C").await.unwrap());
    assert!(!handle.acknowledge("CMD-C").await.unwrap());

    let next = handle.next_for_drone("DRONE001").await.unwrap().unwrap();
    assert_eq!(next.command_id, "CMD-A");
    let remaining: Vec<String> = handle
        .queued()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.command_id)
        .collect();
    assert_eq!(remaining, vec!["CMD-A", "CMD-B"]);

    service.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_custom_pipeline_failures_reach_history() {
    let events = BroadcastSink::new(16);
    let pipeline = CommandPipeline::default()
        .with_executor(Arc::new(FlakyExecutor::default()))
        .with_sink(Arc::new(events.clone()));
    let service = Service::spawn(pipeline, 4, events);
    let mut subscriber = service.subscribe();
    let handle = service.handle();

    assert!(handle.submit(movement("CMD-1", "DRONE001")).await);
    assert!(!handle.submit(movement("CMD-2", "DRONE001")).await);

    assert_eq!(
        handle.status_of("CMD-2").await.unwrap(),
        Some(CommandStatus::Failed)
    );
    let event = subscriber.recv().await.unwrap();
    assert_eq!(event.kind(), SecurityEventKind::CommandError);

    let pipeline = service.shutdown().await.unwrap();
    assert_eq!(pipeline.stats().failed, 1);
    assert_eq!(pipeline.stats().completed, 1);
}

struct BrokenAuditSink;

impl SecurityEventSink for BrokenAuditSink {
    fn record(&self, _event: &SecurityEvent) {
        panic!("audit disk full");
    }
}

#[tokio::test]
async fn test_actor_survives_panicking_sink() {
    let pipeline = CommandPipeline::default()
        .with_executor(Arc::new(FlakyExecutor::default()))
        .with_sink(Arc::new(BrokenAuditSink));
    let service = Service::spawn(pipeline, 4, BroadcastSink::new(4));
    let handle = service.handle();

    assert!(handle.submit(movement("CMD-1", "DRONE001")).await);
    assert!(!handle.submit(movement("CMD-2", "DRONE001")).await);
    assert!(!handle.submit(movement("CMD-3", "DRONE001").with_timestamp(0)).await);

    assert_eq!(
        handle.status_of("CMD-2").await.unwrap(),
        Some(CommandStatus::Failed)
    );
    assert_eq!(handle.queue_length().await, Ok(2));
    assert!(!handle.is_closed());

    let pipeline = service.shutdown().await.unwrap();
    assert_eq!(pipeline.stats().security_events, 2);
}

#[tokio::test]
async fn test_closed_actor_reports_failure() {
    let service = Service::start(&Config::default()).unwrap();
    let handle = service.handle();
    service.shutdown().await.unwrap();

    assert!(!handle.submit(movement("CMD-LATE", "DRONE001")).await);
    assert_eq!(handle.queue_length().await, Err(ServiceError::Closed));
    assert_eq!(handle.status_of("CMD-LATE").await, Err(ServiceError::Closed));
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_start_rejects_invalid_config() {
    let config = Config {
        channel_capacity: 0,
        ..Config::default()
    };
    assert!(matches!(
        Service::start(&config),
        Err(ConfigError::ZeroCapacity("channel capacity"))
    ));
}

#[tokio::test]
async fn test_lenient_parameters_accept_out_of_bounds() {
    let strict = Service::start(&Config::default()).unwrap();
    let lenient = Service::start(&Config {
        strict_parameters: false,
        ..Config::default()
    })
    .unwrap();

    let climb = |id: &str| {
        Command::new(
            id,
            "DRONE001",
            CommandPayload::Movement(MovementParams::AltitudeChange {
                target_altitude_m: 400.0,
            }),
            CommandSource::new("operator-1", SourceType::User, "OPERATOR"),
        )
        .with_signature("signed")
    };

    assert!(!strict.handle().submit(climb("CMD-HIGH-1")).await);
    assert!(lenient.handle().submit(climb("CMD-HIGH-2")).await);

    strict.shutdown().await.unwrap();
    lenient.shutdown().await.unwrap();
}
