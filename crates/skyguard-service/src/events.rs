//! Publishes security events to live subscribers.

use skyguard_core::{SecurityEvent, SecurityEventSink};
use tokio::sync::broadcast;

/// Security event sink backed by a `broadcast` channel. Subscribers that
/// fall more than the buffer behind miss the oldest events.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<SecurityEvent>,
}

impl BroadcastSink {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SecurityEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl SecurityEventSink for BroadcastSink {
    fn record(&self, event: &SecurityEvent) {
        // No subscribers is the common case for headless runs.
        let _ = self.tx.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyguard_core::{
        Command, CommandPayload, CommandSource, MovementParams, SecurityEventKind, SourceType,
    };

    fn event() -> SecurityEvent {
        let command = Command::new(
            "CMD-1",
            "DRONE001",
            CommandPayload::Movement(MovementParams::Land),
            CommandSource::new("op-1", SourceType::User, "USER"),
        );
        SecurityEvent::CommandError {
            command,
            error: "Drone not reachable: DRONE001".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let sink = BroadcastSink::new(8);
        let mut first = sink.subscribe();
        let mut second = sink.subscribe();

        sink.record(&event());

        assert_eq!(sink.subscriber_count(), 2);
        assert_eq!(first.recv().await.unwrap().kind(), SecurityEventKind::CommandError);
        assert_eq!(second.recv().await.unwrap().command().command_id, "CMD-1");
    }

    #[test]
    fn test_record_without_subscribers() {
        let sink = BroadcastSink::new(0);
        sink.record(&event());
        assert_eq!(sink.subscriber_count(), 0);
    }
}
