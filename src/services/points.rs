//! Per-user point balances, in minor currency units.
//!
//! Debits run under the map's entry lock as conditional decrements, so a
//! balance can never go negative even under concurrent redemptions. Refunds
//! from completed returns are credited here.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::Money;

#[derive(Clone, Default)]
pub struct PointsService {
    balances: Arc<DashMap<Uuid, Money>>,
}

impl PointsService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance; users with no history hold zero.
    pub fn balance(&self, user_id: Uuid) -> Money {
        self.balances.get(&user_id).map(|b| *b).unwrap_or(0)
    }

    #[instrument(skip(self))]
    pub fn credit(&self, user_id: Uuid, amount: Money) -> Result<Money, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "credit amount must be positive".to_string(),
            ));
        }
        let mut entry = self.balances.entry(user_id).or_insert(0);
        *entry += amount;
        debug!(user_id = %user_id, amount, balance = *entry, "points credited");
        Ok(*entry)
    }

    /// Conditional decrement: fails without touching the balance if it would
    /// go negative.
    #[instrument(skip(self))]
    pub fn debit(&self, user_id: Uuid, amount: Money) -> Result<Money, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "debit amount must be positive".to_string(),
            ));
        }
        let mut entry = self.balances.entry(user_id).or_insert(0);
        if *entry < amount {
            return Err(ServiceError::ValidationError(format!(
                "insufficient points: balance {}, requested {}",
                *entry, amount
            )));
        }
        *entry -= amount;
        debug!(user_id = %user_id, amount, balance = *entry, "points debited");
        Ok(*entry)
    }
}
