//! Domain events emitted by the order core.
//!
//! Events are best-effort notifications for downstream consumers (webhooks,
//! analytics, notification fan-out live elsewhere); a failed send never
//! fails the operation that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CheckoutStarted {
        session_id: Uuid,
        user_id: Uuid,
        total_price: Money,
    },
    PaymentConfirmed {
        session_id: Uuid,
        order_id: Uuid,
        amount: Money,
    },
    OrderCreated(Uuid),
    OrderCancelled(Uuid),
    OrderShipped {
        order_id: Uuid,
        tracking_number: String,
    },
    OrderDelivered {
        order_id: Uuid,
        delivered_at: DateTime<Utc>,
    },
    ReturnRequested {
        order_id: Uuid,
        reason: String,
    },
    ReturnApproved {
        order_id: Uuid,
    },
    ReturnCompleted {
        order_id: Uuid,
        refund_amount: Money,
    },
    StockAdjusted {
        product_id: Uuid,
        size: Option<String>,
        new_available: i64,
    },
    CouponIssued {
        user_id: Uuid,
        coupon_id: Uuid,
    },
    CouponRedeemed {
        user_coupon_id: Uuid,
        order_id: Uuid,
    },
    PointsCredited {
        user_id: Uuid,
        amount: Money,
    },
    PointsDebited {
        user_id: Uuid,
        amount: Money,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("failed to send event: {}", e))
    }

    /// Best-effort send; logs and moves on if the channel is closed or full.
    pub async fn notify(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping domain event");
        }
    }
}

/// Drains the event channel, logging each event. Spawned once at startup.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "domain event");
    }
    info!("event channel closed; processor exiting");
}
