use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::events::Event;
use crate::models::{Coupon, UserCoupon};
use crate::services::coupons::CreateCouponInput;
use crate::{ApiResponse, AppState};

/// A wallet entry: the held instance joined with its definition.
#[derive(Debug, Serialize)]
pub struct WalletCoupon {
    #[serde(flatten)]
    pub held: UserCoupon,
    pub coupon: Coupon,
}

/// GET /coupons
pub async fn list_my_coupons(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<WalletCoupon>>>, ServiceError> {
    let wallet = state
        .services
        .coupons
        .list_for_user(user.user_id)
        .into_iter()
        .map(|(held, coupon)| WalletCoupon { held, coupon })
        .collect();
    Ok(Json(ApiResponse::success(wallet)))
}

/// POST /admin/coupons
pub async fn create_coupon(
    State(state): State<AppState>,
    Json(payload): Json<CreateCouponInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let coupon = state.services.coupons.create_coupon(payload)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(coupon))))
}

#[derive(Debug, Deserialize)]
pub struct IssueCouponRequest {
    pub user_id: Uuid,
}

/// POST /admin/coupons/:id/issue
pub async fn issue_coupon(
    State(state): State<AppState>,
    Path(coupon_id): Path<Uuid>,
    Json(payload): Json<IssueCouponRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let held = state.services.coupons.issue(payload.user_id, coupon_id)?;
    state
        .event_sender
        .notify(Event::CouponIssued {
            user_id: payload.user_id,
            coupon_id,
        })
        .await;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(held))))
}
