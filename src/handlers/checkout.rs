use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::models::{CheckoutSession, DiscountSelection, Quote, Selection, ShippingInfo};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct ShippingRequest {
    #[validate(length(min = 1))]
    pub recipient: String,
    #[validate(length(min = 1))]
    pub address: String,
    #[validate(length(min = 1))]
    pub phone: String,
}

impl From<ShippingRequest> for ShippingInfo {
    fn from(req: ShippingRequest) -> Self {
        Self {
            recipient: req.recipient,
            address: req.address,
            phone: req.phone,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartCheckoutRequest {
    pub selection: Selection,
    #[validate]
    pub shipping: ShippingRequest,
}

/// POST /checkout
pub async fn start_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<StartCheckoutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    let session = state
        .services
        .checkout
        .create(user.user_id, &payload.selection, payload.shipping.into())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(session))))
}

/// GET /checkout/:id
pub async fn get_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CheckoutSession>>, ServiceError> {
    let session = state.services.checkout.get(session_id)?;
    if session.user_id != user.user_id {
        return Err(ServiceError::Forbidden(
            "checkout session belongs to a different user".to_string(),
        ));
    }
    Ok(Json(ApiResponse::success(session)))
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteQuery {
    pub user_coupon_id: Option<Uuid>,
    #[serde(default)]
    pub points_to_redeem: i64,
}

/// GET /checkout/:id/quote
///
/// Live price preview for the coupon/point selection the customer is
/// currently toying with. Nothing is consumed.
pub async fn quote_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<ApiResponse<Quote>>, ServiceError> {
    let discounts = DiscountSelection {
        user_coupon_id: query.user_coupon_id,
        points_to_redeem: query.points_to_redeem,
    };
    let quote = state
        .services
        .payments
        .quote(session_id, user.user_id, &discounts)?;
    Ok(Json(ApiResponse::success(quote)))
}
