use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::{
    call::CallStatus, invoice::InvoiceStatus, material_request::MaterialRequestStatus,
    order::OrderStatus, quotation::QuotationStatus,
};

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

    /// Sends an event and logs instead of failing the caller. Used after a
    /// write has committed, when there is nothing left to roll back.
    pub async fn publish(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Dropping event");
        }
    }
}

/// Things that happened, pushed to connected clients over the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
    },
    OrderUpdated {
        order_id: Uuid,
    },
    OrderStatusChanged {
        order_id: Uuid,
        order_number: String,
        from: OrderStatus,
        to: OrderStatus,
        version: i32,
    },
    OrderAssigned {
        order_id: Uuid,
        designer_id: Option<Uuid>,
        printer_id: Option<Uuid>,
    },
    OrderDeleted {
        order_id: Uuid,
    },
    QuotationSubmitted {
        quotation_id: Uuid,
        quotation_number: String,
    },
    QuotationReviewed {
        quotation_id: Uuid,
        status: QuotationStatus,
    },
    QuotationConverted {
        quotation_id: Uuid,
        order_id: Uuid,
    },
    InvoiceCreated {
        invoice_id: Uuid,
        invoice_number: String,
    },
    InvoiceStatusChanged {
        invoice_id: Uuid,
        status: InvoiceStatus,
    },
    PaymentRecorded {
        invoice_id: Uuid,
        payment_id: Uuid,
        amount: Decimal,
        remaining: Decimal,
    },
    CustomerChanged {
        customer_id: Uuid,
    },
    StockAdjusted {
        item_id: Uuid,
        delta: Decimal,
        quantity: Decimal,
    },
    LowStock {
        item_id: Uuid,
        name: String,
        quantity: Decimal,
        min_quantity: Decimal,
    },
    MaterialRequestCreated {
        request_id: Uuid,
        item_name: String,
    },
    MaterialRequestUpdated {
        request_id: Uuid,
        status: MaterialRequestStatus,
    },
    MessageSent {
        chat_id: Uuid,
        message_id: Uuid,
        sender_id: Uuid,
        recipients: Vec<Uuid>,
    },
    CallUpdated {
        call_id: Uuid,
        status: CallStatus,
        caller_id: Uuid,
        receiver_id: Uuid,
    },
    CallCandidateAdded {
        call_id: Uuid,
        recipient_id: Uuid,
    },
    NotificationCreated {
        notification_id: Uuid,
        user_id: Uuid,
    },
}

impl Event {
    /// Event name used as the SSE `event:` field and in logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::OrderCreated { .. } => "order_created",
            Event::OrderUpdated { .. } => "order_updated",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::OrderAssigned { .. } => "order_assigned",
            Event::OrderDeleted { .. } => "order_deleted",
            Event::QuotationSubmitted { .. } => "quotation_submitted",
            Event::QuotationReviewed { .. } => "quotation_reviewed",
            Event::QuotationConverted { .. } => "quotation_converted",
            Event::InvoiceCreated { .. } => "invoice_created",
            Event::InvoiceStatusChanged { .. } => "invoice_status_changed",
            Event::PaymentRecorded { .. } => "payment_recorded",
            Event::CustomerChanged { .. } => "customer_changed",
            Event::StockAdjusted { .. } => "stock_adjusted",
            Event::LowStock { .. } => "low_stock",
            Event::MaterialRequestCreated { .. } => "material_request_created",
            Event::MaterialRequestUpdated { .. } => "material_request_updated",
            Event::MessageSent { .. } => "message_sent",
            Event::CallUpdated { .. } => "call_updated",
            Event::CallCandidateAdded { .. } => "call_candidate_added",
            Event::NotificationCreated { .. } => "notification_created",
        }
    }

    /// Users allowed to receive this event. `None` means every signed-in
    /// user; chat, call and notification events are private.
    pub fn recipients(&self) -> Option<Vec<Uuid>> {
        match self {
            Event::MessageSent { recipients, .. } => Some(recipients.clone()),
            Event::CallUpdated {
                caller_id,
                receiver_id,
                ..
            } => Some(vec![*caller_id, *receiver_id]),
            Event::CallCandidateAdded { recipient_id, .. } => Some(vec![*recipient_id]),
            Event::NotificationCreated { user_id, .. } => Some(vec![*user_id]),
            _ => None,
        }
    }

    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.recipients()
            .map_or(true, |recipients| recipients.contains(&user_id))
    }
}

/// Fan-out point for the live feed. Each SSE connection holds a receiver.
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<Event>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Returns the number of live subscribers that received the event.
    pub fn publish(&self, event: Event) -> usize {
        // An error only means nobody is listening.
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Creates the service-side sender and the receiver to hand to [`process_events`].
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>, hub: EventHub) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        crate::metrics::record_event(event.name());

        match &event {
            Event::LowStock {
                item_id,
                name,
                quantity,
                min_quantity,
            } => {
                warn!(
                    item_id = %item_id,
                    item = %name,
                    quantity = %quantity,
                    min_quantity = %min_quantity,
                    "Stock at or below reorder threshold"
                );
            }
            Event::OrderStatusChanged {
                order_id, from, to, ..
            } => {
                info!(order_id = %order_id, from = %from, to = %to, "Order status changed");
            }
            other => {
                debug!(event = other.name(), "Event received");
            }
        }

        let delivered = hub.publish(event);
        debug!(subscribers = delivered, "Event published to live feed");
    }

    warn!("Event processing loop has ended");
}
