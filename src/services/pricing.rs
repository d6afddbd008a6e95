//! Discount computation: pure, deterministic, integer-only.
//!
//! Called both for live price previews as the customer edits coupon/point
//! selections and for the authoritative server-side charge at confirmation.
//! Coupon *eligibility* (ownership, window, reuse) is validated by the
//! coupon service before this module is invoked; a coupon that merely falls
//! below its minimum order amount contributes zero discount here and is not
//! treated as an error.

use crate::models::{Coupon, CouponKind, Money, Quote};

/// Discount a coupon contributes against `subtotal`. Never exceeds the
/// subtotal; percentage discounts round down and honor the cap.
pub fn coupon_discount(coupon: &Coupon, subtotal: Money) -> Money {
    if let Some(min) = coupon.min_order_amount {
        if subtotal < min {
            return 0;
        }
    }
    match coupon.kind {
        CouponKind::Percentage => {
            let mut discount = subtotal * coupon.discount_value / 100;
            if let Some(cap) = coupon.max_discount_amount {
                discount = discount.min(cap);
            }
            discount.min(subtotal)
        }
        CouponKind::Amount => coupon.discount_value.min(subtotal),
    }
}

/// Computes the final chargeable amount.
///
/// Points are clamped to `min(requested, balance, subtotal - coupon)`: they
/// can never take the total below zero and never exceed the holder's
/// balance. The result is always in `[0, subtotal]`.
pub fn compute(
    subtotal: Money,
    coupon: Option<&Coupon>,
    requested_points: Money,
    point_balance: Money,
) -> Quote {
    let subtotal = subtotal.max(0);
    let coupon_discount = coupon.map(|c| coupon_discount(c, subtotal)).unwrap_or(0);
    let redeemable_room = subtotal - coupon_discount;
    let points_redeemed = requested_points
        .max(0)
        .min(point_balance.max(0))
        .min(redeemable_room);
    let total = (subtotal - coupon_discount - points_redeemed).max(0);
    Quote {
        subtotal,
        coupon_discount,
        points_redeemed,
        total,
    }
}
