//! Authoritative per-(product, size) stock ledger.
//!
//! Every mutation runs under the map's entry lock, so a reserve is a
//! conditional decrement ("decrement where available >= requested") rather
//! than a read-then-write, and concurrent reserves against the same variant
//! serialize. Available quantity never goes negative.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::errors::ServiceError;
use crate::models::{CartLine, OrderLine, StockLevel, VariantKey};

#[derive(Clone, Default)]
pub struct StockService {
    levels: Arc<DashMap<VariantKey, StockLevel>>,
}

/// Admin-facing view of one ledger row.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StockRow {
    pub product_id: uuid::Uuid,
    pub size: Option<String>,
    pub available: i64,
    pub ceiling: Option<i64>,
}

impl StockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining quantity for a variant; unknown variants are a `NotFound`.
    pub fn available(&self, key: &VariantKey) -> Result<i64, ServiceError> {
        self.levels
            .get(key)
            .map(|level| level.available)
            .ok_or_else(|| ServiceError::NotFound(format!("stock variant {} not found", key)))
    }

    /// Atomically reserves `quantity` units, returning the new available
    /// count. Fails with the exact shortfall so the storefront can render
    /// a precise message.
    #[instrument(skip(self))]
    pub fn reserve(&self, key: &VariantKey, quantity: i64) -> Result<i64, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "reserve quantity must be positive".to_string(),
            ));
        }
        let mut level = self
            .levels
            .get_mut(key)
            .ok_or_else(|| ServiceError::NotFound(format!("stock variant {} not found", key)))?;
        if level.available < quantity {
            return Err(ServiceError::InsufficientStock {
                product_id: key.product_id,
                size: key.size.clone(),
                requested: quantity,
                available: level.available,
            });
        }
        level.available -= quantity;
        debug!(variant = %key, quantity, remaining = level.available, "reserved stock");
        Ok(level.available)
    }

    /// Re-credits stock after a cancellation or completed return. Clamped to
    /// the variant's ceiling when one is configured; callers must not fail
    /// because an admin lowered the ceiling mid-flight.
    #[instrument(skip(self))]
    pub fn release(&self, key: &VariantKey, quantity: i64) -> Result<i64, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "release quantity must be positive".to_string(),
            ));
        }
        let mut level = self
            .levels
            .get_mut(key)
            .ok_or_else(|| ServiceError::NotFound(format!("stock variant {} not found", key)))?;
        let mut next = level.available + quantity;
        if let Some(ceiling) = level.ceiling {
            if next > ceiling {
                warn!(variant = %key, next, ceiling, "release clamped to ceiling");
                next = ceiling;
            }
        }
        level.available = next;
        Ok(level.available)
    }

    /// Admin override; also registers previously unknown variants.
    #[instrument(skip(self))]
    pub fn set_absolute(
        &self,
        key: VariantKey,
        quantity: i64,
        ceiling: Option<i64>,
    ) -> Result<i64, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "stock quantity must be non-negative".to_string(),
            ));
        }
        self.levels.insert(
            key,
            StockLevel {
                available: quantity,
                ceiling,
            },
        );
        Ok(quantity)
    }

    /// Advisory check only — no reservation is taken. Used at session
    /// creation; the authoritative reservation happens at confirmation.
    pub fn check_available(&self, lines: &[CartLine]) -> Result<(), ServiceError> {
        for line in lines {
            let key = line.variant_key();
            let available = self.available(&key)?;
            if available < line.quantity {
                return Err(ServiceError::InsufficientStock {
                    product_id: key.product_id,
                    size: key.size,
                    requested: line.quantity,
                    available,
                });
            }
        }
        Ok(())
    }

    /// All-or-nothing reservation across every line; reservations already
    /// taken in this call are rolled back if any line fails. No partial
    /// orders.
    #[instrument(skip_all, fields(lines = lines.len()))]
    pub fn reserve_all(&self, lines: &[CartLine]) -> Result<(), ServiceError> {
        let mut taken: Vec<(VariantKey, i64)> = Vec::with_capacity(lines.len());
        for line in lines {
            let key = line.variant_key();
            match self.reserve(&key, line.quantity) {
                Ok(_) => taken.push((key, line.quantity)),
                Err(err) => {
                    for (k, q) in taken {
                        if let Err(rollback) = self.release(&k, q) {
                            warn!(variant = %k, error = %rollback, "rollback release failed");
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Releases the stock held by a set of ordered lines (cancellation or
    /// completed return).
    pub fn release_order_lines(&self, lines: &[OrderLine]) {
        for line in lines {
            let key = line.variant_key();
            if let Err(err) = self.release(&key, line.quantity) {
                // A missing variant here means the catalog row was removed
                // after the order was placed; log, never fail the caller.
                warn!(variant = %key, error = %err, "stock release skipped");
            }
        }
    }

    pub fn snapshot(&self) -> Vec<StockRow> {
        let mut rows: Vec<StockRow> = self
            .levels
            .iter()
            .map(|entry| StockRow {
                product_id: entry.key().product_id,
                size: entry.key().size.clone(),
                available: entry.value().available,
                ceiling: entry.value().ceiling,
            })
            .collect();
        rows.sort_by(|a, b| (a.product_id, &a.size).cmp(&(b.product_id, &b.size)));
        rows
    }
}
