//! Core domain types for the order lifecycle and pricing/inventory engine.
//!
//! All monetary values are integers in the smallest currency unit; no
//! floating point arithmetic happens anywhere in pricing or refunds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Amount in the smallest currency unit.
pub type Money = i64;

/// A (product, size) pair with its own independent stock count.
///
/// `size == None` means a sizeless product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantKey {
    pub product_id: Uuid,
    pub size: Option<String>,
}

impl VariantKey {
    pub fn new(product_id: Uuid, size: Option<String>) -> Self {
        Self { product_id, size }
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.size {
            Some(size) => write!(f, "{}/{}", self.product_id, size),
            None => write!(f, "{}", self.product_id),
        }
    }
}

/// Stock counters for one variant. `ceiling` is the configured maximum the
/// variant may be re-credited back up to on cancellation or return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLevel {
    pub available: i64,
    pub ceiling: Option<i64>,
}

/// Catalog entry. Prices copied into cart lines are point-in-time snapshots
/// of `unit_price`, not live references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub unit_price: Money,
    /// Registered size labels; a `None` entry means the sizeless variant.
    pub sizes: Vec<Option<String>>,
    pub created_at: DateTime<Utc>,
}

/// One item of a purchase selection as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionItem {
    pub product_id: Uuid,
    pub quantity: i64,
    #[serde(default)]
    pub size: Option<String>,
}

/// Discriminated purchase selection: a single "buy now" item or the chosen
/// lines of an existing cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum Selection {
    #[serde(rename = "BUY_NOW")]
    BuyNow { item: SelectionItem },
    #[serde(rename = "CART")]
    Cart { items: Vec<SelectionItem> },
}

/// Canonical cart line with a price snapshot taken at aggregation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub size: Option<String>,
}

impl CartLine {
    pub fn variant_key(&self) -> VariantKey {
        VariantKey::new(self.product_id, self.size.clone())
    }

    /// `None` when the product of price and quantity does not fit in
    /// [`Money`]; callers treat that as a malformed selection.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// Aggregated selection. An empty `lines` means "nothing to purchase" and
/// blocks checkout; it is not an error by itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub total_count: i64,
    pub total_price: Money,
}

impl CartSummary {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponKind {
    Percentage,
    Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub kind: CouponKind,
    /// Percent (e.g. 10) for `Percentage`, minor units for `Amount`.
    pub discount_value: i64,
    pub min_order_amount: Option<Money>,
    /// Upper bound on the computed discount; percentage kind only.
    pub max_discount_amount: Option<Money>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub reusable: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn in_window(&self, now: DateTime<Utc>) -> bool {
        if let Some(from) = self.valid_from {
            if now < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponStatus {
    Available,
    Used,
}

/// A coupon instance held by one user; consumed by at most one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCoupon {
    pub id: Uuid,
    pub user_id: Uuid,
    pub coupon_id: Uuid,
    pub status: CouponStatus,
    pub used_order_id: Option<Uuid>,
    pub obtained_at: DateTime<Utc>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

impl UserCoupon {
    pub fn usable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == CouponStatus::Available && now >= self.valid_from && now <= self.valid_until
    }
}

/// Recipient details captured at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub recipient: String,
    pub address: String,
    pub phone: String,
}

/// Server-issued checkout draft the payment widget references. Terminal once
/// `consumed_order` is set; replaying the session returns that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub shipping: ShippingInfo,
    pub lines: Vec<CartLine>,
    pub total_count: i64,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub consumed_order: Option<Uuid>,
}

/// Coupon/points choices a customer attached to a payment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscountSelection {
    #[serde(default)]
    pub user_coupon_id: Option<Uuid>,
    #[serde(default)]
    pub points_to_redeem: Money,
}

/// Result of a discount computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub subtotal: Money,
    pub coupon_discount: Money,
    pub points_redeemed: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Ordered,
    Shipped,
    Delivered,
    Cancelled,
    ReturnRequested,
    ReturnShipping,
    Returned,
}

impl OrderStatus {
    /// The order state machine. `Cancelled` is reachable only from the
    /// pre-fulfillment state; `Cancelled` and `Returned` are terminal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Ordered, Shipped)
                | (Ordered, Cancelled)
                | (Shipped, Delivered)
                | (Delivered, ReturnRequested)
                | (ReturnRequested, ReturnShipping)
                | (ReturnShipping, Returned)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }

    pub fn parse(s: &str) -> Option<OrderStatus> {
        use OrderStatus::*;
        match s.to_ascii_uppercase().as_str() {
            "ORDERED" => Some(Ordered),
            "SHIPPED" => Some(Shipped),
            "DELIVERED" => Some(Delivered),
            "CANCELLED" | "CANCELED" => Some(Cancelled),
            "RETURN_REQUESTED" => Some(ReturnRequested),
            "RETURN_SHIPPING" => Some(ReturnShipping),
            "RETURNED" => Some(Returned),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Ordered => "ORDERED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::ReturnRequested => "RETURN_REQUESTED",
            OrderStatus::ReturnShipping => "RETURN_SHIPPING",
            OrderStatus::Returned => "RETURNED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnReason {
    /// Product fault: full refund, no shipping fee deduction.
    Defect,
    /// Buyer-initiated: refund minus the admin-supplied shipping fee.
    ChangeOfMind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnMethod {
    SelfShip,
    Pickup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnInfo {
    pub reason: ReturnReason,
    pub method: ReturnMethod,
    /// Shipping fee the customer bears; always 0 for `Defect`.
    pub shipping_fee: Money,
    pub tracking_number: Option<String>,
    pub requested_at: DateTime<Utc>,
}

/// Ordered line item: a size-locked snapshot decoupled from live stock, so
/// later stock or price changes never retroactively alter order history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub size: Option<String>,
}

impl OrderLine {
    pub fn variant_key(&self) -> VariantKey {
        VariantKey::new(self.product_id, self.size.clone())
    }
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            size: line.size.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    pub coupon_discount: Money,
    pub points_redeemed: Money,
    /// What the payment gateway actually authorized:
    /// `max(0, subtotal - coupon_discount - points_redeemed)`.
    pub total_amount: Money,
    pub user_coupon_id: Option<Uuid>,
    pub payment_key: String,
    pub status: OrderStatus,
    pub shipping: ShippingInfo,
    pub tracking_number: Option<String>,
    pub return_info: Option<ReturnInfo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}
