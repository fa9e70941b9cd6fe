use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::inventory_transaction::TransactionType;
use crate::entities::stock_alert::{AlertStatus, AlertType};

/// Domain events published after a mutation commits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    MaterialCreated {
        tenant_id: Uuid,
        material_id: Uuid,
    },
    StockAdjusted {
        tenant_id: Uuid,
        material_id: Uuid,
        transaction_id: Uuid,
        transaction_type: TransactionType,
        quantity_before: Decimal,
        quantity_after: Decimal,
    },
    ProductionRecorded {
        tenant_id: Uuid,
        product_id: Uuid,
        recipe_id: Uuid,
        quantity: Decimal,
        transaction_ids: Vec<Uuid>,
    },
    StockAlertRaised {
        tenant_id: Uuid,
        alert_id: Uuid,
        material_id: Uuid,
        alert_type: AlertType,
    },
    StockAlertStatusChanged {
        tenant_id: Uuid,
        alert_id: Uuid,
        old_status: AlertStatus,
        new_status: AlertStatus,
        changed_at: DateTime<Utc>,
    },
    RecipeActivated {
        tenant_id: Uuid,
        product_id: Uuid,
        recipe_id: Uuid,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::MaterialCreated { .. } => "material_created",
            Event::StockAdjusted { .. } => "stock_adjusted",
            Event::ProductionRecorded { .. } => "production_recorded",
            Event::StockAlertRaised { .. } => "stock_alert_raised",
            Event::StockAlertStatusChanged { .. } => "stock_alert_status_changed",
            Event::RecipeActivated { .. } => "recipe_activated",
        }
    }
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

    /// Publishes events of a mutation that has already committed.
    /// Delivery failures are logged and never surfaced to the caller.
    pub async fn publish_all(&self, events: Vec<Event>) {
        for event in events {
            let name = event.name();
            match self.send(event).await {
                Ok(()) => counter!("stockline_events.published", 1, "event" => name),
                Err(e) => {
                    counter!("stockline_events.dropped", 1, "event" => name);
                    warn!(event = name, error = %e, "Event delivery failed");
                }
            }
        }
    }
}

/// Consumes events until every sender is dropped
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockAlertRaised {
                tenant_id,
                material_id,
                alert_type,
                ..
            } => {
                warn!(%tenant_id, %material_id, %alert_type, "Stock alert raised");
            }
            Event::ProductionRecorded {
                tenant_id,
                product_id,
                quantity,
                ..
            } => {
                info!(%tenant_id, %product_id, %quantity, "Production recorded");
            }
            other => {
                info!(event = other.name(), payload = ?other, "Received event");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_all_delivers_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let tenant_id = Uuid::new_v4();
        let events = vec![
            Event::MaterialCreated {
                tenant_id,
                material_id: Uuid::new_v4(),
            },
            Event::RecipeActivated {
                tenant_id,
                product_id: Uuid::new_v4(),
                recipe_id: Uuid::new_v4(),
            },
        ];

        sender.publish_all(events.clone()).await;

        assert_eq!(rx.recv().await, Some(events[0].clone()));
        assert_eq!(rx.recv().await, Some(events[1].clone()));
    }

    #[tokio::test]
    async fn publish_all_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        sender
            .publish_all(vec![Event::MaterialCreated {
                tenant_id: Uuid::new_v4(),
                material_id: Uuid::new_v4(),
            }])
            .await;
    }

    #[tokio::test]
    async fn processing_loop_ends_when_senders_drop() {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(process_events(rx));
        EventSender::new(tx)
            .send(Event::MaterialCreated {
                tenant_id: Uuid::new_v4(),
                material_id: Uuid::new_v4(),
            })
            .await
            .unwrap();
        handle.await.unwrap();
    }
}
