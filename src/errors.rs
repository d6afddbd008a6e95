//! Service error taxonomy and its HTTP mapping.
//!
//! Every mutating operation either fully succeeds or reports exactly one of
//! these kinds; nothing is silently swallowed. `AmountMismatch` is the one
//! kind whose wire message is deliberately generic — the full mismatch
//! context is logged server-side for reconciliation instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Money, OrderStatus};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("insufficient stock for {product_id} (size {size:?}): requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        size: Option<String>,
        requested: i64,
        available: i64,
    },

    #[error("coupon invalid: {0}")]
    CouponInvalid(String),

    #[error("amount mismatch: server computed {server_amount}, client declared {client_amount}")]
    AmountMismatch {
        server_amount: Money,
        client_amount: Money,
    },

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::InsufficientStock { .. } => StatusCode::CONFLICT,
            ServiceError::CouponInvalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::AmountMismatch { .. } => StatusCode::PAYMENT_REQUIRED,
            ServiceError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ServiceError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed on the wire. Stock shortfalls are reported exactly so
    /// the storefront can render a precise message; payment mismatches are
    /// not, to avoid leaking reconciliation internals to the client.
    pub fn response_message(&self) -> String {
        match self {
            ServiceError::AmountMismatch { .. } => "payment could not be completed".to_string(),
            other => other.to_string(),
        }
    }
}

/// Standard error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}
