//! Order store and the lifecycle state machine around it.
//!
//! Every transition runs under the order's entry lock: the status check and
//! the write are one atomic step, so two concurrent requests can never both
//! move the same order. Events and cross-service compensation (stock
//! release, point credits, coupon restoration) happen after the lock drops.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{
    Money, Order, OrderStatus, ReturnInfo, ReturnMethod, ReturnReason,
};
use crate::services::coupons::CouponService;
use crate::services::points::PointsService;
use crate::services::stock::StockService;

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<DashMap<Uuid, Order>>,
    stock: StockService,
    points: PointsService,
    coupons: CouponService,
    event_sender: Arc<EventSender>,
    return_window: Duration,
}

impl OrderService {
    pub fn new(
        stock: StockService,
        points: PointsService,
        coupons: CouponService,
        event_sender: Arc<EventSender>,
        return_window_days: u32,
    ) -> Self {
        Self {
            orders: Arc::new(DashMap::new()),
            stock,
            points,
            coupons,
            event_sender,
            return_window: Duration::days(return_window_days as i64),
        }
    }

    pub(crate) fn insert(&self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn get(&self, order_id: Uuid) -> Result<Order, ServiceError> {
        self.orders
            .get(&order_id)
            .map(|o| o.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))
    }

    /// Customer view of one order; other users' orders read as forbidden,
    /// not as missing.
    pub fn get_for_user(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, ServiceError> {
        let order = self.get(order_id)?;
        if order.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "order belongs to a different user".to_string(),
            ));
        }
        Ok(order)
    }

    /// The user's order history, newest first.
    pub fn list_for_user(&self, user_id: Uuid) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .map(|o| o.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Admin listing with optional status filter, newest first.
    pub fn list_all(&self, status: Option<OrderStatus>, offset: usize, limit: usize) -> (Vec<Order>, usize) {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .map(|o| o.clone())
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = orders.len();
        let page = orders.into_iter().skip(offset).take(limit).collect();
        (page, total)
    }

    /// Checked transition under the order's entry lock. `mutate` runs only
    /// after the transition is validated, with the status already advanced.
    fn transition<F>(
        &self,
        order_id: Uuid,
        to: OrderStatus,
        mutate: F,
    ) -> Result<Order, ServiceError>
    where
        F: FnOnce(&mut Order) -> Result<(), ServiceError>,
    {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;
        if !order.status.can_transition_to(to) {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to,
            });
        }
        let previous = (order.status, order.updated_at);
        order.status = to;
        order.updated_at = Utc::now();
        if let Err(err) = mutate(&mut order) {
            (order.status, order.updated_at) = previous;
            return Err(err);
        }
        Ok(order.clone())
    }

    #[instrument(skip(self))]
    pub async fn ship(&self, order_id: Uuid, tracking_number: &str) -> Result<Order, ServiceError> {
        if tracking_number.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "tracking number is required to ship".to_string(),
            ));
        }
        let order = self.transition(order_id, OrderStatus::Shipped, |order| {
            order.tracking_number = Some(tracking_number.trim().to_string());
            Ok(())
        })?;
        self.event_sender
            .notify(Event::OrderShipped {
                order_id,
                tracking_number: tracking_number.trim().to_string(),
            })
            .await;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn deliver(&self, order_id: Uuid) -> Result<Order, ServiceError> {
        let delivered_at = Utc::now();
        let order = self.transition(order_id, OrderStatus::Delivered, |order| {
            order.delivered_at = Some(delivered_at);
            Ok(())
        })?;
        self.event_sender
            .notify(Event::OrderDelivered {
                order_id,
                delivered_at,
            })
            .await;
        Ok(order)
    }

    /// Customer cancellation, possible only before fulfillment. Releases the
    /// reserved stock, refunds redeemed points and restores the coupon.
    #[instrument(skip(self))]
    pub async fn cancel(&self, order_id: Uuid, user_id: Uuid) -> Result<Order, ServiceError> {
        self.get_for_user(order_id, user_id)?;
        let order = self.transition(order_id, OrderStatus::Cancelled, |_| Ok(()))?;

        self.stock.release_order_lines(&order.lines);
        if order.points_redeemed > 0 {
            if let Err(err) = self.points.credit(order.user_id, order.points_redeemed) {
                warn!(order_id = %order_id, error = %err, "point refund on cancel failed");
            }
        }
        if let Some(user_coupon_id) = order.user_coupon_id {
            if let Err(err) = self.coupons.revert(user_coupon_id, order_id) {
                warn!(order_id = %order_id, error = %err, "coupon restore on cancel failed");
            }
        }
        info!(order_id = %order_id, "order cancelled");
        self.event_sender.notify(Event::OrderCancelled(order_id)).await;
        Ok(order)
    }

    /// Customer return request, allowed only while the order is delivered
    /// and within the return window. A defect return never bears a shipping
    /// fee; a change-of-mind return carries the quoted fee.
    #[instrument(skip(self))]
    pub async fn request_return(
        &self,
        order_id: Uuid,
        user_id: Uuid,
        reason: ReturnReason,
        method: ReturnMethod,
        shipping_fee: Money,
    ) -> Result<Order, ServiceError> {
        if shipping_fee < 0 {
            return Err(ServiceError::ValidationError(
                "return shipping fee must be non-negative".to_string(),
            ));
        }
        let current = self.get_for_user(order_id, user_id)?;
        if let Some(delivered_at) = current.delivered_at {
            if Utc::now() - delivered_at > self.return_window {
                return Err(ServiceError::ValidationError(
                    "return window has closed".to_string(),
                ));
            }
        }

        let fee = match reason {
            ReturnReason::Defect => 0,
            ReturnReason::ChangeOfMind => shipping_fee,
        };
        let order = self.transition(order_id, OrderStatus::ReturnRequested, |order| {
            order.return_info = Some(ReturnInfo {
                reason,
                method,
                shipping_fee: fee,
                tracking_number: None,
                requested_at: Utc::now(),
            });
            Ok(())
        })?;
        self.event_sender
            .notify(Event::ReturnRequested {
                order_id,
                reason: format!("{:?}", reason),
            })
            .await;
        Ok(order)
    }

    /// Admin approval moves the return into transit. Pickup returns need the
    /// carrier tracking number assigned here; self-ship returns may supply
    /// it later.
    #[instrument(skip(self))]
    pub async fn approve_return(
        &self,
        order_id: Uuid,
        tracking_number: Option<String>,
    ) -> Result<Order, ServiceError> {
        let order = self.transition(order_id, OrderStatus::ReturnShipping, |order| {
            let info = order.return_info.as_mut().ok_or_else(|| {
                ServiceError::InternalError("return approved without a request".to_string())
            })?;
            if info.method == ReturnMethod::Pickup && tracking_number.is_none() {
                return Err(ServiceError::ValidationError(
                    "pickup returns need a tracking number at approval".to_string(),
                ));
            }
            info.tracking_number = tracking_number.clone();
            Ok(())
        })?;
        self.event_sender.notify(Event::ReturnApproved { order_id }).await;
        Ok(order)
    }

    /// Finalizes a return once the goods are back. The refund is the paid
    /// amount minus the final shipping fee, credited to the user's points;
    /// stock is released only now. Defect returns always refund in full.
    #[instrument(skip(self))]
    pub async fn complete_return(
        &self,
        order_id: Uuid,
        final_fee: Option<Money>,
    ) -> Result<Order, ServiceError> {
        if let Some(fee) = final_fee {
            if fee < 0 {
                return Err(ServiceError::ValidationError(
                    "return shipping fee must be non-negative".to_string(),
                ));
            }
        }
        let mut refund_amount = 0;
        let order = self.transition(order_id, OrderStatus::Returned, |order| {
            let info = order.return_info.as_mut().ok_or_else(|| {
                ServiceError::InternalError("return completed without a request".to_string())
            })?;
            let fee = match info.reason {
                ReturnReason::Defect => 0,
                ReturnReason::ChangeOfMind => final_fee.unwrap_or(info.shipping_fee),
            };
            if fee > order.total_amount {
                return Err(ServiceError::ValidationError(
                    "return shipping fee exceeds the paid amount".to_string(),
                ));
            }
            info.shipping_fee = fee;
            refund_amount = order.total_amount - fee;
            Ok(())
        })?;

        self.stock.release_order_lines(&order.lines);
        if refund_amount > 0 {
            if let Err(err) = self.points.credit(order.user_id, refund_amount) {
                warn!(order_id = %order_id, error = %err, "refund credit failed");
            } else {
                self.event_sender
                    .notify(Event::PointsCredited {
                        user_id: order.user_id,
                        amount: refund_amount,
                    })
                    .await;
            }
        }
        info!(order_id = %order_id, refund_amount, "return completed");
        self.event_sender
            .notify(Event::ReturnCompleted {
                order_id,
                refund_amount,
            })
            .await;
        Ok(order)
    }

    /// Admin correction of the outbound tracking number. Closed orders are
    /// immutable.
    #[instrument(skip(self))]
    pub fn update_tracking(
        &self,
        order_id: Uuid,
        tracking_number: &str,
    ) -> Result<Order, ServiceError> {
        if tracking_number.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "tracking number must not be blank".to_string(),
            ));
        }
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;
        if order.status.is_terminal() {
            return Err(ServiceError::ValidationError(format!(
                "cannot edit tracking on a {} order",
                order.status
            )));
        }
        order.tracking_number = Some(tracking_number.trim().to_string());
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
