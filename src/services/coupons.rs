//! Coupon definitions and per-user coupon instances.
//!
//! A definition describes the discount; an issued [`UserCoupon`] is the
//! single-use (unless reusable) instance a customer actually redeems. State
//! transitions on an instance run under the map's entry lock so one instance
//! can never pay for two orders.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{Coupon, CouponKind, CouponStatus, Money, UserCoupon};

/// Issued instances are valid this long from the moment of issuance, unless
/// the definition's own window ends sooner.
const ISSUED_VALIDITY_DAYS: i64 = 30;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateCouponInput {
    pub name: String,
    pub code: String,
    pub kind: CouponKind,
    pub discount_value: i64,
    #[serde(default)]
    pub min_order_amount: Option<Money>,
    #[serde(default)]
    pub max_discount_amount: Option<Money>,
    #[serde(default)]
    pub valid_from: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    pub reusable: bool,
}

#[derive(Clone, Default)]
pub struct CouponService {
    coupons: Arc<DashMap<Uuid, Coupon>>,
    user_coupons: Arc<DashMap<Uuid, UserCoupon>>,
}

impl CouponService {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub fn create_coupon(&self, input: CreateCouponInput) -> Result<Coupon, ServiceError> {
        if input.name.trim().is_empty() || input.code.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "coupon name and code must not be blank".to_string(),
            ));
        }
        match input.kind {
            CouponKind::Percentage if !(1..=100).contains(&input.discount_value) => {
                return Err(ServiceError::ValidationError(
                    "percentage discount must be between 1 and 100".to_string(),
                ));
            }
            CouponKind::Amount if input.discount_value <= 0 => {
                return Err(ServiceError::ValidationError(
                    "amount discount must be positive".to_string(),
                ));
            }
            _ => {}
        }
        if let (Some(from), Some(until)) = (input.valid_from, input.valid_until) {
            if until < from {
                return Err(ServiceError::ValidationError(
                    "coupon validity window ends before it starts".to_string(),
                ));
            }
        }

        let coupon = Coupon {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_string(),
            kind: input.kind,
            discount_value: input.discount_value,
            min_order_amount: input.min_order_amount,
            max_discount_amount: input.max_discount_amount,
            valid_from: input.valid_from,
            valid_until: input.valid_until,
            reusable: input.reusable,
            created_at: Utc::now(),
        };
        self.coupons.insert(coupon.id, coupon.clone());
        Ok(coupon)
    }

    pub fn get_coupon(&self, coupon_id: Uuid) -> Result<Coupon, ServiceError> {
        self.coupons
            .get(&coupon_id)
            .map(|c| c.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("coupon {} not found", coupon_id)))
    }

    /// Issues an instance of `coupon_id` to `user_id`. A non-reusable coupon
    /// may be held at most once per user, counting already-used instances.
    #[instrument(skip(self))]
    pub fn issue(&self, user_id: Uuid, coupon_id: Uuid) -> Result<UserCoupon, ServiceError> {
        let coupon = self.get_coupon(coupon_id)?;
        let now = Utc::now();
        if !coupon.in_window(now) {
            return Err(ServiceError::CouponInvalid(
                "coupon is outside its validity window".to_string(),
            ));
        }
        if !coupon.reusable {
            let already_held = self
                .user_coupons
                .iter()
                .any(|uc| uc.user_id == user_id && uc.coupon_id == coupon_id);
            if already_held {
                return Err(ServiceError::CouponInvalid(
                    "coupon already issued to this user".to_string(),
                ));
            }
        }

        let mut valid_until = now + Duration::days(ISSUED_VALIDITY_DAYS);
        if let Some(until) = coupon.valid_until {
            valid_until = valid_until.min(until);
        }
        let user_coupon = UserCoupon {
            id: Uuid::new_v4(),
            user_id,
            coupon_id,
            status: CouponStatus::Available,
            used_order_id: None,
            obtained_at: now,
            valid_from: now,
            valid_until,
        };
        self.user_coupons.insert(user_coupon.id, user_coupon.clone());
        debug!(user_coupon_id = %user_coupon.id, "coupon issued");
        Ok(user_coupon)
    }

    /// The user's wallet, newest first.
    pub fn list_for_user(&self, user_id: Uuid) -> Vec<(UserCoupon, Coupon)> {
        let mut held: Vec<(UserCoupon, Coupon)> = self
            .user_coupons
            .iter()
            .filter(|uc| uc.user_id == user_id)
            .filter_map(|uc| {
                self.coupons
                    .get(&uc.coupon_id)
                    .map(|c| (uc.clone(), c.clone()))
            })
            .collect();
        held.sort_by(|a, b| b.0.obtained_at.cmp(&a.0.obtained_at));
        held
    }

    /// Resolves a user coupon to its definition iff it is redeemable by this
    /// user right now. An unknown id is a `NotFound`; a known but unusable
    /// instance is a `CouponInvalid`.
    pub fn validate_for_user(
        &self,
        user_coupon_id: Uuid,
        user_id: Uuid,
    ) -> Result<Coupon, ServiceError> {
        let user_coupon = self
            .user_coupons
            .get(&user_coupon_id)
            .map(|uc| uc.clone())
            .ok_or_else(|| {
                ServiceError::NotFound(format!("user coupon {} not found", user_coupon_id))
            })?;
        if user_coupon.user_id != user_id {
            return Err(ServiceError::CouponInvalid(
                "coupon belongs to a different user".to_string(),
            ));
        }
        if user_coupon.status == CouponStatus::Used {
            return Err(ServiceError::CouponInvalid(
                "coupon has already been used".to_string(),
            ));
        }
        if !user_coupon.usable_at(Utc::now()) {
            return Err(ServiceError::CouponInvalid(
                "coupon is outside its validity window".to_string(),
            ));
        }
        self.get_coupon(user_coupon.coupon_id)
    }

    /// Marks the instance as consumed by `order_id`. Only an `Available`
    /// instance can flip; the check and the write share one entry lock.
    #[instrument(skip(self))]
    pub fn mark_used(&self, user_coupon_id: Uuid, order_id: Uuid) -> Result<(), ServiceError> {
        let mut user_coupon = self.user_coupons.get_mut(&user_coupon_id).ok_or_else(|| {
            ServiceError::NotFound(format!("user coupon {} not found", user_coupon_id))
        })?;
        if user_coupon.status != CouponStatus::Available {
            return Err(ServiceError::CouponInvalid(
                "coupon has already been used".to_string(),
            ));
        }
        user_coupon.status = CouponStatus::Used;
        user_coupon.used_order_id = Some(order_id);
        Ok(())
    }

    /// Returns a consumed instance to the wallet after its order is
    /// cancelled. Only flips an instance that was used by that exact order.
    #[instrument(skip(self))]
    pub fn revert(&self, user_coupon_id: Uuid, order_id: Uuid) -> Result<(), ServiceError> {
        let mut user_coupon = self.user_coupons.get_mut(&user_coupon_id).ok_or_else(|| {
            ServiceError::NotFound(format!("user coupon {} not found", user_coupon_id))
        })?;
        if user_coupon.status != CouponStatus::Used
            || user_coupon.used_order_id != Some(order_id)
        {
            return Err(ServiceError::CouponInvalid(
                "coupon was not consumed by this order".to_string(),
            ));
        }
        user_coupon.status = CouponStatus::Available;
        user_coupon.used_order_id = None;
        debug!(user_coupon_id = %user_coupon_id, "coupon restored");
        Ok(())
    }

    pub fn get_user_coupon(&self, user_coupon_id: Uuid) -> Result<UserCoupon, ServiceError> {
        self.user_coupons
            .get(&user_coupon_id)
            .map(|uc| uc.clone())
            .ok_or_else(|| {
                ServiceError::NotFound(format!("user coupon {} not found", user_coupon_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with_coupon(reusable: bool) -> (CouponService, Coupon) {
        let service = CouponService::new();
        let coupon = service
            .create_coupon(CreateCouponInput {
                name: "Launch 10%".into(),
                code: "LAUNCH10".into(),
                kind: CouponKind::Percentage,
                discount_value: 10,
                min_order_amount: None,
                max_discount_amount: None,
                valid_from: None,
                valid_until: None,
                reusable,
            })
            .unwrap();
        (service, coupon)
    }

    #[test]
    fn non_reusable_coupon_issued_once_per_user() {
        let (service, coupon) = service_with_coupon(false);
        let user = Uuid::new_v4();
        service.issue(user, coupon.id).unwrap();
        assert!(matches!(
            service.issue(user, coupon.id),
            Err(ServiceError::CouponInvalid(_))
        ));
        // a different user is unaffected
        assert!(service.issue(Uuid::new_v4(), coupon.id).is_ok());
    }

    #[test]
    fn reusable_coupon_can_be_reissued() {
        let (service, coupon) = service_with_coupon(true);
        let user = Uuid::new_v4();
        service.issue(user, coupon.id).unwrap();
        assert!(service.issue(user, coupon.id).is_ok());
    }

    #[test]
    fn validate_distinguishes_unknown_from_unusable() {
        let (service, coupon) = service_with_coupon(false);
        let user = Uuid::new_v4();
        let held = service.issue(user, coupon.id).unwrap();

        assert!(matches!(
            service.validate_for_user(Uuid::new_v4(), user),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.validate_for_user(held.id, Uuid::new_v4()),
            Err(ServiceError::CouponInvalid(_))
        ));
        assert!(service.validate_for_user(held.id, user).is_ok());
    }

    #[test]
    fn used_coupon_cannot_pay_twice_but_reverts_after_cancel() {
        let (service, coupon) = service_with_coupon(false);
        let user = Uuid::new_v4();
        let held = service.issue(user, coupon.id).unwrap();
        let order = Uuid::new_v4();

        service.mark_used(held.id, order).unwrap();
        assert!(matches!(
            service.validate_for_user(held.id, user),
            Err(ServiceError::CouponInvalid(_))
        ));
        assert!(service.mark_used(held.id, Uuid::new_v4()).is_err());

        // revert is bound to the consuming order
        assert!(service.revert(held.id, Uuid::new_v4()).is_err());
        service.revert(held.id, order).unwrap();
        assert!(service.validate_for_user(held.id, user).is_ok());
    }

    #[test]
    fn issuance_window_is_capped_by_definition() {
        let service = CouponService::new();
        let ends_soon = Utc::now() + Duration::days(3);
        let coupon = service
            .create_coupon(CreateCouponInput {
                name: "Flash".into(),
                code: "FLASH".into(),
                kind: CouponKind::Amount,
                discount_value: 2_000,
                min_order_amount: None,
                max_discount_amount: None,
                valid_from: None,
                valid_until: Some(ends_soon),
                reusable: false,
            })
            .unwrap();
        let held = service.issue(Uuid::new_v4(), coupon.id).unwrap();
        assert!(held.valid_until <= ends_soon);
    }
}
