//! Cart aggregation: normalizes a "buy now" selection or a set of cart
//! lines into one canonical list with derived totals.
//!
//! The contract is deliberately forgiving: an empty or malformed selection
//! yields the empty summary. Callers treat "nothing to purchase" as a
//! blocked checkout, not an error, so a stale client can never turn a bad
//! payload into a partial cart.

use tracing::debug;

use crate::models::{CartLine, CartSummary, Money, Selection, SelectionItem};
use crate::services::catalog::CatalogService;

#[derive(Clone)]
pub struct CartService {
    catalog: CatalogService,
}

impl CartService {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog }
    }

    /// Produces the canonical line list. Output ordering matches input
    /// ordering; prices and names are snapshots taken from the catalog now.
    pub fn aggregate(&self, selection: &Selection) -> CartSummary {
        let items: Vec<&SelectionItem> = match selection {
            Selection::BuyNow { item } => vec![item],
            Selection::Cart { items } => items.iter().collect(),
        };

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            if item.quantity <= 0 {
                debug!(product_id = %item.product_id, quantity = item.quantity, "rejecting selection: non-positive quantity");
                return CartSummary::default();
            }
            let product = match self.catalog.get(item.product_id) {
                Ok(p) => p,
                Err(_) => {
                    debug!(product_id = %item.product_id, "rejecting selection: unknown product");
                    return CartSummary::default();
                }
            };
            if !self.catalog.has_variant(&product, &item.size) {
                debug!(product_id = %item.product_id, size = ?item.size, "rejecting selection: unknown size");
                return CartSummary::default();
            }
            lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                unit_price: product.unit_price,
                quantity: item.quantity,
                size: item.size.clone(),
            });
        }

        let mut total_count: i64 = 0;
        let mut total_price: Money = 0;
        for line in &lines {
            let totals = line.line_total().and_then(|line_total| {
                Some((
                    total_count.checked_add(line.quantity)?,
                    total_price.checked_add(line_total)?,
                ))
            });
            match totals {
                Some((count, price)) => {
                    total_count = count;
                    total_price = price;
                }
                None => {
                    debug!(product_id = %line.product_id, quantity = line.quantity, "rejecting selection: totals overflow");
                    return CartSummary::default();
                }
            }
        }
        CartSummary {
            lines,
            total_count,
            total_price,
        }
    }
}
