use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::models::{Money, Order, ReturnMethod, ReturnReason};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    pub reason: ReturnReason,
    pub method: ReturnMethod,
    /// Quoted return shipping fee; ignored for defect returns.
    #[serde(default)]
    pub shipping_fee: Money,
}

/// POST /orders/:id/return
pub async fn request_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<ReturnRequest>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order = state
        .services
        .orders
        .request_return(
            order_id,
            user.user_id,
            payload.reason,
            payload.method,
            payload.shipping_fee,
        )
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveReturnRequest {
    /// Required when the return is collected by pickup.
    pub tracking_number: Option<String>,
}

/// POST /admin/orders/:id/return/approve
pub async fn approve_return(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<ApproveReturnRequest>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order = state
        .services
        .orders
        .approve_return(order_id, payload.tracking_number)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteReturnRequest {
    /// Final shipping fee after inspection; falls back to the quoted fee.
    pub shipping_fee: Option<Money>,
}

/// POST /admin/orders/:id/return/complete
pub async fn complete_return(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<CompleteReturnRequest>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order = state
        .services
        .orders
        .complete_return(order_id, payload.shipping_fee)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
