//! Product registry feeding the cart aggregator with display metadata and
//! price snapshots. Prices read here are point-in-time copies; later catalog
//! edits never retroactively change carts or orders.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{Money, Product, VariantKey};
use crate::services::stock::StockService;

/// Per-size initial stock when registering a product.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VariantInput {
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: i64,
}

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<DashMap<Uuid, Product>>,
    stock: StockService,
}

impl CatalogService {
    pub fn new(stock: StockService) -> Self {
        Self {
            products: Arc::new(DashMap::new()),
            stock,
        }
    }

    /// Registers a product and seeds its per-size stock rows. The initial
    /// quantity doubles as the release ceiling.
    #[instrument(skip(self))]
    pub fn create_product(
        &self,
        name: &str,
        unit_price: Money,
        variants: Vec<VariantInput>,
    ) -> Result<Product, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "product name must not be blank".to_string(),
            ));
        }
        if unit_price < 0 {
            return Err(ServiceError::ValidationError(
                "product price must be non-negative".to_string(),
            ));
        }
        if variants.is_empty() {
            return Err(ServiceError::ValidationError(
                "product needs at least one variant".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let mut sizes = Vec::with_capacity(variants.len());
        for variant in &variants {
            if variant.quantity < 0 {
                return Err(ServiceError::ValidationError(
                    "variant stock must be non-negative".to_string(),
                ));
            }
            sizes.push(variant.size.clone());
        }

        let product = Product {
            id,
            name: name.trim().to_string(),
            unit_price,
            sizes,
            created_at: Utc::now(),
        };
        self.products.insert(id, product.clone());
        for variant in variants {
            self.stock.set_absolute(
                VariantKey::new(id, variant.size),
                variant.quantity,
                Some(variant.quantity),
            )?;
        }
        Ok(product)
    }

    pub fn get(&self, product_id: Uuid) -> Result<Product, ServiceError> {
        self.products
            .get(&product_id)
            .map(|p| p.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("product {} not found", product_id)))
    }

    /// Whether `size` names a registered variant of the product.
    pub fn has_variant(&self, product: &Product, size: &Option<String>) -> bool {
        product.sizes.iter().any(|s| s == size)
    }
}
