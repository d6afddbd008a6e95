use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::models::Money;
use crate::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub struct PointBalance {
    pub user_id: Uuid,
    pub balance: Money,
}

/// GET /points
pub async fn get_my_points(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<PointBalance>>, ServiceError> {
    Ok(Json(ApiResponse::success(PointBalance {
        user_id: user.user_id,
        balance: state.services.points.balance(user.user_id),
    })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreditPointsRequest {
    pub user_id: Uuid,
    #[validate(range(min = 1))]
    pub amount: i64,
}

/// POST /admin/points/credit
pub async fn credit_points(
    State(state): State<AppState>,
    Json(payload): Json<CreditPointsRequest>,
) -> Result<Json<ApiResponse<PointBalance>>, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    let balance = state
        .services
        .points
        .credit(payload.user_id, payload.amount)?;
    state
        .event_sender
        .notify(Event::PointsCredited {
            user_id: payload.user_id,
            amount: payload.amount,
        })
        .await;
    Ok(Json(ApiResponse::success(PointBalance {
        user_id: payload.user_id,
        balance,
    })))
}
