use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::models::{Order, OrderStatus};
use crate::{ApiResponse, AppState, ListQuery, PaginatedResponse};

/// GET /orders
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Order>>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.orders.list_for_user(user.user_id),
    )))
}

/// GET /orders/:id
pub async fn get_my_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.orders.get_for_user(order_id, user.user_id)?,
    )))
}

/// POST /orders/:id/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order = state.services.orders.cancel(order_id, user.user_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminOrdersQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub status: Option<String>,
}

/// GET /admin/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<AdminOrdersQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<Order>>>, ServiceError> {
    let status = query
        .status
        .as_deref()
        .map(|raw| {
            OrderStatus::parse(raw).ok_or_else(|| {
                ServiceError::ValidationError(format!("unknown order status: {raw}"))
            })
        })
        .transpose()?;
    let (page, per_page) = ListQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .page_bounds();
    let offset = page.saturating_sub(1).saturating_mul(per_page);
    let (items, total) = state
        .services
        .orders
        .list_all(status, offset as usize, per_page as usize);
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total: total as u64,
        page,
        per_page,
    })))
}

/// GET /admin/orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    Ok(Json(ApiResponse::success(state.services.orders.get(order_id)?)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrackingRequest {
    #[validate(length(min = 1))]
    pub tracking_number: String,
}

/// POST /admin/orders/:id/ship
pub async fn ship_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<TrackingRequest>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    let order = state
        .services
        .orders
        .ship(order_id, &payload.tracking_number)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// POST /admin/orders/:id/deliver
pub async fn deliver_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order = state.services.orders.deliver(order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// PUT /admin/orders/:id/tracking
pub async fn update_tracking(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<TrackingRequest>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    let order = state
        .services
        .orders
        .update_tracking(order_id, &payload.tracking_number)?;
    Ok(Json(ApiResponse::success(order)))
}
