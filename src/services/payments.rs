//! Payment confirmation: the single authoritative write path that turns a
//! checkout session into an order.
//!
//! The whole decision runs while holding the session's entry lock, so two
//! confirmations of the same session serialize: the first creates the order
//! and stamps it onto the session, the second sees the stamp and returns the
//! same order without charging anything twice. The server recomputes the
//! amount from its own price snapshots and rejects any client total that
//! disagrees, to the unit.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{DiscountSelection, Money, Order, OrderLine, OrderStatus, Quote};
use crate::services::checkout::CheckoutService;
use crate::services::coupons::CouponService;
use crate::services::points::PointsService;
use crate::services::pricing;
use crate::services::stock::StockService;

#[derive(Clone)]
pub struct PaymentService {
    checkout: CheckoutService,
    stock: StockService,
    points: PointsService,
    coupons: CouponService,
    orders: crate::services::orders::OrderService,
    event_sender: Arc<EventSender>,
}

impl PaymentService {
    pub fn new(
        checkout: CheckoutService,
        stock: StockService,
        points: PointsService,
        coupons: CouponService,
        orders: crate::services::orders::OrderService,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            checkout,
            stock,
            points,
            coupons,
            orders,
            event_sender,
        }
    }

    /// Server-side price preview for a session with the given discount
    /// selection. Consumes nothing.
    pub fn quote(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        discounts: &DiscountSelection,
    ) -> Result<Quote, ServiceError> {
        let session = self.checkout.get(session_id)?;
        if session.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "checkout session belongs to a different user".to_string(),
            ));
        }
        let coupon = discounts
            .user_coupon_id
            .map(|id| self.coupons.validate_for_user(id, user_id))
            .transpose()?;
        Ok(pricing::compute(
            session.total_price,
            coupon.as_ref(),
            discounts.points_to_redeem,
            self.points.balance(user_id),
        ))
    }

    /// Confirms payment for a session and creates the order.
    ///
    /// Idempotent per session: a replay returns the already-created order.
    /// On any failure after stock was reserved, the reservation (and any
    /// point debit) is compensated before the error is returned.
    #[instrument(skip(self, discounts), fields(session_id = %session_id))]
    pub async fn confirm(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        payment_key: &str,
        client_amount: Money,
        discounts: &DiscountSelection,
    ) -> Result<Order, ServiceError> {
        if payment_key.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "payment key is required".to_string(),
            ));
        }

        // Sync critical section under the session entry lock.
        let (order, quote) = {
            let mut session = self.checkout.entry(session_id).ok_or_else(|| {
                ServiceError::NotFound(format!("checkout session {} not found", session_id))
            })?;

            if session.user_id != user_id {
                return Err(ServiceError::Forbidden(
                    "checkout session belongs to a different user".to_string(),
                ));
            }
            // Idempotent replay is for the owner retrying, checked above.
            if let Some(order_id) = session.consumed_order {
                info!(order_id = %order_id, "replayed confirmation for consumed session");
                return self.orders.get(order_id);
            }
            if self.checkout.is_expired(&session) {
                return Err(ServiceError::NotFound(format!(
                    "checkout session {} not found",
                    session_id
                )));
            }

            let coupon = discounts
                .user_coupon_id
                .map(|id| self.coupons.validate_for_user(id, user_id))
                .transpose()?;
            let quote = pricing::compute(
                session.total_price,
                coupon.as_ref(),
                discounts.points_to_redeem,
                self.points.balance(user_id),
            );
            if quote.total != client_amount {
                warn!(
                    session_id = %session_id,
                    server_amount = quote.total,
                    client_amount,
                    subtotal = quote.subtotal,
                    coupon_discount = quote.coupon_discount,
                    points_redeemed = quote.points_redeemed,
                    "payment amount mismatch"
                );
                return Err(ServiceError::AmountMismatch {
                    server_amount: quote.total,
                    client_amount,
                });
            }

            self.stock.reserve_all(&session.lines)?;

            if quote.points_redeemed > 0 {
                if let Err(err) = self.points.debit(user_id, quote.points_redeemed) {
                    self.stock.release_order_lines(
                        &session.lines.iter().map(OrderLine::from).collect::<Vec<_>>(),
                    );
                    return Err(err);
                }
            }

            let order_id = Uuid::new_v4();
            // A coupon that contributed nothing is left in the wallet.
            let consumed_coupon = if quote.coupon_discount > 0 {
                discounts.user_coupon_id
            } else {
                None
            };
            if let Some(user_coupon_id) = consumed_coupon {
                if let Err(err) = self.coupons.mark_used(user_coupon_id, order_id) {
                    if quote.points_redeemed > 0 {
                        if let Err(credit_err) =
                            self.points.credit(user_id, quote.points_redeemed)
                        {
                            warn!(error = %credit_err, "point rollback failed");
                        }
                    }
                    self.stock.release_order_lines(
                        &session.lines.iter().map(OrderLine::from).collect::<Vec<_>>(),
                    );
                    return Err(err);
                }
            }

            let now = Utc::now();
            let order = Order {
                id: order_id,
                order_number: session.order_number.clone(),
                user_id,
                lines: session.lines.iter().map(OrderLine::from).collect(),
                subtotal: quote.subtotal,
                coupon_discount: quote.coupon_discount,
                points_redeemed: quote.points_redeemed,
                total_amount: quote.total,
                user_coupon_id: consumed_coupon,
                payment_key: payment_key.trim().to_string(),
                status: OrderStatus::Ordered,
                shipping: session.shipping.clone(),
                tracking_number: None,
                return_info: None,
                created_at: now,
                updated_at: now,
                delivered_at: None,
            };
            self.orders.insert(order.clone());
            session.consumed_order = Some(order_id);
            (order, quote)
        };

        info!(order_id = %order.id, amount = quote.total, "payment confirmed");
        self.event_sender
            .notify(Event::PaymentConfirmed {
                session_id,
                order_id: order.id,
                amount: quote.total,
            })
            .await;
        self.event_sender.notify(Event::OrderCreated(order.id)).await;
        if quote.points_redeemed > 0 {
            self.event_sender
                .notify(Event::PointsDebited {
                    user_id,
                    amount: quote.points_redeemed,
                })
                .await;
        }
        if let Some(user_coupon_id) = order.user_coupon_id {
            self.event_sender
                .notify(Event::CouponRedeemed {
                    user_coupon_id,
                    order_id: order.id,
                })
                .await;
        }
        Ok(order)
    }
}
