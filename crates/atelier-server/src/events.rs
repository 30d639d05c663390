//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] decouples order mutations from their side effects: the
//! payment path publishes an event and returns; the notification worker
//! consumes events on its own task, so a failing consumer can never undo
//! a confirmed payment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event published when an order transitions to paid.
pub const ORDER_PAID: &str = "order.paid";

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// A domain event that occurred on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"order.paid"`.
    pub event_type: String,
    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,
    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    /// Create a new event with an empty payload.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no active subscribers the event is silently dropped; that is
    /// a valid configuration (e.g. SMTP disabled), not an error.
    pub fn publish(&self, event: PlatformEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            PlatformEvent::new(ORDER_PAID)
                .with_payload(serde_json::json!({"orderNo": "ATL-1"})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, ORDER_PAID);
        assert_eq!(received.payload["orderNo"], "ATL-1");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(PlatformEvent::new("multi.test"));

        assert_eq!(rx1.recv().await.unwrap().event_type, "multi.test");
        assert_eq!(rx2.recv().await.unwrap().event_type, "multi.test");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(PlatformEvent::new("orphan.event"));
    }
}
