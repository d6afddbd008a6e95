//! Identity extraction.
//!
//! Authentication lives in the upstream gateway; this core trusts the user
//! identifier it is handed. Customer endpoints extract [`AuthUser`] from the
//! `X-User-Id` header; admin routes are mounted behind the gateway's admin
//! guard and carry no per-request identity here.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::HeaderName, request::Parts},
};
use uuid::Uuid;

use crate::errors::ServiceError;

pub static USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// The authenticated customer on whose behalf a request runs.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(&USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(|user_id| AuthUser { user_id })
            .ok_or_else(|| {
                ServiceError::Forbidden("missing or malformed X-User-Id header".to_string())
            })
    }
}
