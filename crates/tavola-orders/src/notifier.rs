//! # Event Notifier
//!
//! The engine announces `new_order` and `order_status_update` after the
//! corresponding write has committed. Delivery to kitchen screens, web
//! clients or messaging is the subscriber's job.
//!
//! ```text
//! OrderPipeline ──┐
//!                 ├──▶ dyn EventNotifier ──▶ BroadcastNotifier ──▶ subscribers
//! Transitions ────┘                      └─▶ NoopNotifier
//! ```

use tokio::sync::broadcast;
use tracing::debug;

use tavola_core::OrderEvent;

/// Default capacity of the broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Receives domain events. Must not block.
pub trait EventNotifier: Send + Sync {
    fn notify(&self, event: &OrderEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl EventNotifier for NoopNotifier {
    fn notify(&self, _event: &OrderEvent) {}
}

/// Fans events out over a tokio broadcast channel.
///
/// Slow subscribers lag and lose the oldest events; the engine never waits.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<OrderEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        BroadcastNotifier { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventNotifier for BroadcastNotifier {
    fn notify(&self, event: &OrderEvent) {
        match self.tx.send(event.clone()) {
            Ok(receivers) => debug!(
                event = event.name(),
                order_id = %event.order_id(),
                receivers,
                "Event published"
            ),
            // No subscribers is not an error
            Err(_) => debug!(event = event.name(), "Event dropped, no subscribers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tavola_core::{OrderStatus, OrderStatusEvent};

    fn status_event() -> OrderEvent {
        OrderEvent::OrderStatusUpdate(OrderStatusEvent {
            order_id: "o-1".into(),
            order_number: "POS-20250101-0001".into(),
            branch_id: "b-1".into(),
            status: OrderStatus::Confirmed,
            previous_status: OrderStatus::Pending,
            updated_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 1);

        notifier.notify(&status_event());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.name(), "order_status_update");
        assert_eq!(received.branch_id(), "b-1");
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        BroadcastNotifier::default().notify(&status_event());
        NoopNotifier.notify(&status_event());
    }
}
