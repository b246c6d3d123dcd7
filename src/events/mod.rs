use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the engine. Consumers are observability-only; nothing in
/// the request path depends on an event being delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    PurchaseOrderCreated(Uuid),
    PurchaseOrderStatusChanged {
        purchase_order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PurchaseOrderReceived {
        purchase_order_id: Uuid,
        total_units: i64,
        lots_created: usize,
        new_status: String,
    },
    LowStock {
        product_id: Uuid,
        stock_quantity: i32,
        reorder_threshold: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging (rather than propagating) a delivery failure.
    /// Used after a commit, where the primary operation already succeeded.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            warn!("Dropping event {:?}: {}", event, e);
        }
    }
}

/// Background task draining the event channel. Runs for the lifetime of the
/// process; exits when all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        match &event {
            Event::PurchaseOrderReceived {
                purchase_order_id,
                total_units,
                lots_created,
                new_status,
            } => {
                info!(
                    order_id = %purchase_order_id,
                    total_units,
                    lots_created,
                    new_status = %new_status,
                    "Purchase order shipment received"
                );
            }
            Event::PurchaseOrderStatusChanged {
                purchase_order_id,
                old_status,
                new_status,
            } => {
                info!(
                    order_id = %purchase_order_id,
                    from = %old_status,
                    to = %new_status,
                    "Purchase order status changed"
                );
            }
            _ => info!("Event processed: {:?}", event),
        }
    }
    info!("Event channel closed; event processor shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        // Must not panic or error out
        sender.send_or_log(Event::PurchaseOrderCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();
        sender.send(Event::PurchaseOrderCreated(id)).await.unwrap();
        sender
            .send(Event::PurchaseOrderStatusChanged {
                purchase_order_id: id,
                old_status: "PENDING".into(),
                new_status: "ORDERED".into(),
            })
            .await
            .unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(Event::PurchaseOrderCreated(got)) if got == id
        ));
        assert!(matches!(
            rx.recv().await,
            Some(Event::PurchaseOrderStatusChanged { .. })
        ));
    }
}
