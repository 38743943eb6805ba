use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Domain events emitted after a service commits. In-process only; consumers
/// subscribe by holding the receiving end of the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Stock count events
    StockCountCreated(Uuid),
    StockCountReviewed(Uuid),
    StockCountPosted {
        count_id: Uuid,
        adjustments: usize,
    },

    // Order events
    OrderCreated(Uuid),
    OrderPosted(Uuid),
    OrderVoided(Uuid),
    OrderKitchenStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Waste events
    WasteRecordCreated(Uuid),
    WasteApproved(Uuid),

    // Goods receipt events
    GoodsReceiptCreated(Uuid),
    GoodsReceiptPosted(Uuid),
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
}

/// Drains the event channel, logging each event. Runs until every sender is
/// dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "domain event");
    }
}
