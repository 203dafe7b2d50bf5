//! Outbound position-change events.
//!
//! The settlement engine announces which users' positions changed after a
//! run. Delivery mechanics (SSE, pub/sub) live outside this crate; the sink
//! is fire-and-forget and consumers must tolerate at-least-once delivery.

use crate::domain::UserId;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::info;

/// A successful settlement run touched these users' positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionsChanged {
    pub users: Vec<UserId>,
}

/// Sink for position-change notifications.
#[async_trait]
pub trait PositionEventSink: Send + Sync {
    /// Announce changed positions. Must not fail the settlement run.
    async fn positions_changed(&self, users: &[UserId]);
}

/// Default sink: logs the event.
#[derive(Debug, Default)]
pub struct LogEventSink;

#[async_trait]
impl PositionEventSink for LogEventSink {
    async fn positions_changed(&self, users: &[UserId]) {
        info!(user_count = users.len(), "positions changed");
    }
}

/// Broadcast-channel sink for in-process consumers (e.g. a push-delivery
/// layer). Send errors mean no subscriber is listening, which is fine.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: broadcast::Sender<PositionsChanged>,
}

impl ChannelEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PositionsChanged> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl PositionEventSink for ChannelEventSink {
    async fn positions_changed(&self, users: &[UserId]) {
        let _ = self.tx.send(PositionsChanged {
            users: users.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_to_subscriber() {
        let sink = ChannelEventSink::new(8);
        let mut rx = sink.subscribe();

        sink.positions_changed(&[UserId::new("u1"), UserId::new("u2")]).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.users, vec![UserId::new("u1"), UserId::new("u2")]);
    }

    #[tokio::test]
    async fn test_channel_sink_without_subscribers_does_not_panic() {
        let sink = ChannelEventSink::new(8);
        sink.positions_changed(&[UserId::new("u1")]).await;
    }
}
