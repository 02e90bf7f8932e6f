use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::notifications::{Mailer, OutboundMail};

/// Domain events emitted after a transaction commits. Consumers never
/// influence the outcome of the request that produced the event.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        order_number: String,
        email: Option<String>,
        tracking_url: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        order_number: String,
        email: Option<String>,
        status: String,
        title: String,
    },
    OrderCancelled {
        order_id: Uuid,
        order_number: String,
        email: Option<String>,
    },
    StockOpnameCompleted {
        opname_id: Uuid,
        opname_number: String,
        adjusted_count: usize,
    },
}

/// Cloneable sending half handed to services. Sending is best effort: a
/// full or closed channel is logged and dropped, never surfaced to callers.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }

    pub async fn send(&self, event: Event) {
        if let Err(e) = self.tx.send(event).await {
            error!("Failed to enqueue event: {}", e);
        }
    }
}

/// Background worker draining the event channel and driving notifications.
/// Mail failures are logged and swallowed.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, mailer: std::sync::Arc<dyn Mailer>) {
    info!("Event processor started");
    while let Some(event) = rx.recv().await {
        debug!(?event, "Processing event");
        if let Some(mail) = mail_for(&event) {
            if let Err(e) = mailer.send(mail).await {
                error!("Failed to send notification email: {}", e);
            }
        }
    }
    info!("Event processor stopped: channel closed");
}

fn mail_for(event: &Event) -> Option<OutboundMail> {
    match event {
        Event::OrderCreated {
            order_number,
            email: Some(to),
            tracking_url,
            ..
        } => Some(OutboundMail {
            to: to.clone(),
            subject: format!("Pesanan {} diterima", order_number),
            body: format!(
                "Terima kasih! Pesanan {} sedang kami proses.\nLacak pesanan Anda: {}",
                order_number, tracking_url
            ),
        }),
        Event::OrderStatusChanged {
            order_number,
            email: Some(to),
            title,
            ..
        } => Some(OutboundMail {
            to: to.clone(),
            subject: format!("Pesanan {}: {}", order_number, title),
            body: format!("Status pesanan {} sekarang: {}", order_number, title),
        }),
        Event::OrderCancelled {
            order_number,
            email: Some(to),
            ..
        } => Some(OutboundMail {
            to: to.clone(),
            subject: format!("Pesanan {} dibatalkan", order_number),
            body: format!(
                "Pesanan {} telah dibatalkan. Stok dan kupon Anda telah dikembalikan.",
                order_number
            ),
        }),
        _ => None,
    }
}
