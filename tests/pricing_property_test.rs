//! Property tests for the discount computation.

use chrono::Utc;
use proptest::prelude::*;
use uuid::Uuid;

use capstore_api::models::{Coupon, CouponKind};
use capstore_api::services::pricing;

fn arb_coupon() -> impl Strategy<Value = Coupon> {
    (
        prop_oneof![Just(CouponKind::Percentage), Just(CouponKind::Amount)],
        1i64..=100,
        1i64..=200_000,
        proptest::option::of(0i64..=100_000),
        proptest::option::of(1i64..=50_000),
    )
        .prop_map(|(kind, percent, amount, min_order, cap)| {
            let discount_value = match kind {
                CouponKind::Percentage => percent,
                CouponKind::Amount => amount,
            };
            Coupon {
                id: Uuid::new_v4(),
                name: "prop".into(),
                code: "PROP".into(),
                kind,
                discount_value,
                min_order_amount: min_order,
                max_discount_amount: cap,
                valid_from: None,
                valid_until: None,
                reusable: false,
                created_at: Utc::now(),
            }
        })
}

proptest! {
    #[test]
    fn total_stays_within_zero_and_subtotal(
        subtotal in 0i64..=1_000_000,
        coupon in proptest::option::of(arb_coupon()),
        requested_points in -10_000i64..=1_000_000,
        balance in 0i64..=1_000_000,
    ) {
        let quote = pricing::compute(subtotal, coupon.as_ref(), requested_points, balance);
        prop_assert!(quote.total >= 0);
        prop_assert!(quote.total <= subtotal);
        prop_assert_eq!(
            quote.total,
            subtotal - quote.coupon_discount - quote.points_redeemed
        );
    }

    #[test]
    fn discounts_never_exceed_their_inputs(
        subtotal in 0i64..=1_000_000,
        coupon in arb_coupon(),
        requested_points in 0i64..=1_000_000,
        balance in 0i64..=1_000_000,
    ) {
        let quote = pricing::compute(subtotal, Some(&coupon), requested_points, balance);
        prop_assert!(quote.coupon_discount >= 0);
        prop_assert!(quote.coupon_discount <= subtotal);
        if let Some(cap) = coupon.max_discount_amount {
            if coupon.kind == CouponKind::Percentage {
                prop_assert!(quote.coupon_discount <= cap);
            }
        }
        prop_assert!(quote.points_redeemed <= requested_points.max(0));
        prop_assert!(quote.points_redeemed <= balance);
    }

    #[test]
    fn below_minimum_orders_get_no_coupon_discount(
        subtotal in 0i64..=1_000_000,
        coupon in arb_coupon(),
    ) {
        if let Some(min) = coupon.min_order_amount {
            if subtotal < min {
                let quote = pricing::compute(subtotal, Some(&coupon), 0, 0);
                prop_assert_eq!(quote.coupon_discount, 0);
            }
        }
    }

    #[test]
    fn computation_is_deterministic(
        subtotal in 0i64..=1_000_000,
        coupon in proptest::option::of(arb_coupon()),
        requested_points in 0i64..=1_000_000,
        balance in 0i64..=1_000_000,
    ) {
        let a = pricing::compute(subtotal, coupon.as_ref(), requested_points, balance);
        let b = pricing::compute(subtotal, coupon.as_ref(), requested_points, balance);
        prop_assert_eq!(a, b);
    }
}
