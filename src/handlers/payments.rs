use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::models::{DiscountSelection, Money};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmPaymentRequest {
    pub session_id: Uuid,
    /// Gateway reference for the authorized payment.
    #[validate(length(min = 1))]
    pub payment_key: String,
    /// Amount the client believes it paid; must match the server's own
    /// computation exactly.
    pub amount: Money,
    #[serde(default)]
    pub user_coupon_id: Option<Uuid>,
    #[serde(default)]
    pub points_to_redeem: Money,
}

/// POST /payments/confirm
pub async fn confirm_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    let discounts = DiscountSelection {
        user_coupon_id: payload.user_coupon_id,
        points_to_redeem: payload.points_to_redeem,
    };
    let order = state
        .services
        .payments
        .confirm(
            payload.session_id,
            user.user_id,
            &payload.payment_key,
            payload.amount,
            &discounts,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}
