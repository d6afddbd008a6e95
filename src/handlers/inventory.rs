use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;
use crate::events::Event;
use crate::models::{Product, VariantKey};
use crate::services::catalog::VariantInput;
use crate::services::stock::StockRow;
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0))]
    pub unit_price: i64,
    #[validate(length(min = 1))]
    pub variants: Vec<VariantInput>,
}

/// POST /admin/products
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    let product = state
        .services
        .catalog
        .create_product(&payload.name, payload.unit_price, payload.variants)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

/// GET /admin/products/:id
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Product>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.catalog.get(product_id)?,
    )))
}

/// GET /admin/inventory
pub async fn list_inventory(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<StockRow>>>, ServiceError> {
    Ok(Json(ApiResponse::success(state.services.stock.snapshot())))
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub ceiling: Option<i64>,
}

/// PUT /admin/inventory
pub async fn set_stock(
    State(state): State<AppState>,
    Json(payload): Json<SetStockRequest>,
) -> Result<Json<ApiResponse<StockRow>>, ServiceError> {
    // The variant must belong to a registered product; arbitrary rows would
    // never be purchasable.
    let product = state.services.catalog.get(payload.product_id)?;
    if !state.services.catalog.has_variant(&product, &payload.size) {
        return Err(ServiceError::ValidationError(format!(
            "product {} has no size {:?}",
            product.id, payload.size
        )));
    }

    let key = VariantKey::new(payload.product_id, payload.size.clone());
    let available = state
        .services
        .stock
        .set_absolute(key, payload.quantity, payload.ceiling)?;
    state
        .event_sender
        .notify(Event::StockAdjusted {
            product_id: payload.product_id,
            size: payload.size.clone(),
            new_available: available,
        })
        .await;
    Ok(Json(ApiResponse::success(StockRow {
        product_id: payload.product_id,
        size: payload.size,
        available,
        ceiling: payload.ceiling,
    })))
}
