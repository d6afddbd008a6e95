//! Checkout sessions: the server-priced draft a payment widget references.
//!
//! A session freezes the line items, their price snapshots and the shipping
//! details. It takes no stock reservation; the advisory availability check
//! here only rejects hopeless checkouts early. Sessions expire after a
//! configured TTL and are swept lazily on access.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{CheckoutSession, Selection, ShippingInfo};
use crate::services::cart::CartService;
use crate::services::stock::StockService;

#[derive(Clone)]
pub struct CheckoutService {
    sessions: Arc<DashMap<Uuid, CheckoutSession>>,
    cart: CartService,
    stock: StockService,
    event_sender: Arc<EventSender>,
    ttl: Duration,
}

impl CheckoutService {
    pub fn new(
        cart: CartService,
        stock: StockService,
        event_sender: Arc<EventSender>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            cart,
            stock,
            event_sender,
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Opens a session for the given selection. Rejects blank shipping
    /// details, empty/malformed selections and variants that are already
    /// visibly out of stock.
    #[instrument(skip(self, selection, shipping))]
    pub async fn create(
        &self,
        user_id: Uuid,
        selection: &Selection,
        shipping: ShippingInfo,
    ) -> Result<CheckoutSession, ServiceError> {
        if shipping.recipient.trim().is_empty()
            || shipping.address.trim().is_empty()
            || shipping.phone.trim().is_empty()
        {
            return Err(ServiceError::ValidationError(
                "shipping recipient, address and phone are required".to_string(),
            ));
        }

        let summary = self.cart.aggregate(selection);
        if summary.is_empty() {
            return Err(ServiceError::ValidationError(
                "nothing to purchase".to_string(),
            ));
        }
        self.stock.check_available(&summary.lines)?;

        let session = CheckoutSession {
            id: Uuid::new_v4(),
            order_number: generate_order_number(),
            user_id,
            shipping,
            lines: summary.lines,
            total_count: summary.total_count,
            total_price: summary.total_price,
            created_at: Utc::now(),
            consumed_order: None,
        };
        self.sessions.insert(session.id, session.clone());
        debug!(session_id = %session.id, order_number = %session.order_number, "checkout session opened");

        self.event_sender
            .notify(Event::CheckoutStarted {
                session_id: session.id,
                user_id,
                total_price: session.total_price,
            })
            .await;
        Ok(session)
    }

    /// Fetches a live session. Expired sessions are removed on access and
    /// reported as not found; consumed sessions stay retrievable so a
    /// confirmation replay can find its order.
    pub fn get(&self, session_id: Uuid) -> Result<CheckoutSession, ServiceError> {
        let expired = match self.sessions.get(&session_id) {
            Some(session) => {
                if session.consumed_order.is_none()
                    && Utc::now() - session.created_at > self.ttl
                {
                    true
                } else {
                    return Ok(session.clone());
                }
            }
            None => {
                return Err(ServiceError::NotFound(format!(
                    "checkout session {} not found",
                    session_id
                )))
            }
        };
        if expired {
            self.sessions.remove(&session_id);
            debug!(session_id = %session_id, "expired checkout session swept");
        }
        Err(ServiceError::NotFound(format!(
            "checkout session {} not found",
            session_id
        )))
    }

    /// Grabs the entry lock for a session. Payment confirmation holds this
    /// while deciding whether the session was already consumed.
    pub(crate) fn entry(
        &self,
        session_id: Uuid,
    ) -> Option<dashmap::mapref::one::RefMut<'_, Uuid, CheckoutSession>> {
        self.sessions.get_mut(&session_id)
    }

    pub(crate) fn is_expired(&self, session: &CheckoutSession) -> bool {
        session.consumed_order.is_none() && Utc::now() - session.created_at > self.ttl
    }
}

/// Human-referenceable order number: date plus a random suffix. Uniqueness
/// for correctness still comes from the order's UUID.
fn generate_order_number() -> String {
    format!(
        "ORD{}-{:06X}",
        Utc::now().format("%Y%m%d"),
        rand::random::<u32>() & 0xFF_FFFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectionItem;
    use crate::services::catalog::{CatalogService, VariantInput};
    use tokio::sync::mpsc;

    fn setup(ttl_secs: u64) -> (CheckoutService, Uuid) {
        let stock = StockService::new();
        let catalog = CatalogService::new(stock.clone());
        let product = catalog
            .create_product(
                "Denim Bucket Hat",
                32_000,
                vec![VariantInput {
                    size: Some("M".into()),
                    quantity: 3,
                }],
            )
            .unwrap();
        let (tx, _rx) = mpsc::channel(16);
        let checkout = CheckoutService::new(
            CartService::new(catalog),
            stock,
            Arc::new(EventSender::new(tx)),
            ttl_secs,
        );
        (checkout, product.id)
    }

    fn buy_now(product_id: Uuid, quantity: i64) -> Selection {
        Selection::BuyNow {
            item: SelectionItem {
                product_id,
                quantity,
                size: Some("M".into()),
            },
        }
    }

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            recipient: "Ada".into(),
            address: "1 Cap St".into(),
            phone: "010-0000-0000".into(),
        }
    }

    #[tokio::test]
    async fn create_freezes_totals_and_takes_no_stock() {
        let (checkout, pid) = setup(1800);
        let session = checkout
            .create(Uuid::new_v4(), &buy_now(pid, 2), shipping())
            .await
            .unwrap();
        assert_eq!(session.total_price, 64_000);
        assert!(session.order_number.starts_with("ORD"));
        // advisory only: another shopper can still see full stock
        assert!(checkout.get(session.id).is_ok());
    }

    #[tokio::test]
    async fn blank_shipping_and_empty_cart_are_rejected() {
        let (checkout, pid) = setup(1800);
        let mut blank = shipping();
        blank.address = "  ".into();
        assert!(matches!(
            checkout
                .create(Uuid::new_v4(), &buy_now(pid, 1), blank)
                .await,
            Err(ServiceError::ValidationError(_))
        ));
        assert!(matches!(
            checkout
                .create(
                    Uuid::new_v4(),
                    &Selection::Cart { items: vec![] },
                    shipping()
                )
                .await,
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn visibly_out_of_stock_selection_is_rejected() {
        let (checkout, pid) = setup(1800);
        assert!(matches!(
            checkout
                .create(Uuid::new_v4(), &buy_now(pid, 5), shipping())
                .await,
            Err(ServiceError::InsufficientStock { .. })
        ));
    }

    #[tokio::test]
    async fn expired_session_is_swept_on_access() {
        let (checkout, pid) = setup(0);
        let session = checkout
            .create(Uuid::new_v4(), &buy_now(pid, 1), shipping())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert!(matches!(
            checkout.get(session.id),
            Err(ServiceError::NotFound(_))
        ));
    }
}
