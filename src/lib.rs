//! Order lifecycle and pricing/inventory engine for a headwear storefront.
//!
//! The crate is layered the usual way: `models` holds the domain types,
//! `services` the business logic over shared in-memory stores, `handlers`
//! the HTTP surface, with `events` carrying best-effort domain notifications
//! out of the write paths.

pub mod auth;
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod models;
pub mod services;

use axum::{
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use errors::ServiceError;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub services: handlers::AppServices,
    pub event_sender: Arc<events::EventSender>,
}

impl AppState {
    pub fn new(config: config::AppConfig, event_sender: Arc<events::EventSender>) -> Self {
        let services = handlers::AppServices::build(&config, event_sender.clone());
        Self {
            config: Arc::new(config),
            services,
            event_sender,
        }
    }
}

/// Standard success envelope returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// Common pagination query parameters.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ListQuery {
    /// Normalized (page, per_page), 1-based and capped.
    pub fn page_bounds(&self) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page, per_page)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn api_v1_routes() -> Router<AppState> {
    let customer = Router::new()
        .route("/checkout", post(handlers::checkout::start_checkout))
        .route("/checkout/:id", get(handlers::checkout::get_checkout))
        .route(
            "/checkout/:id/quote",
            get(handlers::checkout::quote_checkout),
        )
        .route("/payments/confirm", post(handlers::payments::confirm_payment))
        .route("/orders", get(handlers::orders::list_my_orders))
        .route("/orders/:id", get(handlers::orders::get_my_order))
        .route("/orders/:id/cancel", post(handlers::orders::cancel_order))
        .route("/orders/:id/return", post(handlers::returns::request_return))
        .route("/coupons", get(handlers::coupons::list_my_coupons))
        .route("/points", get(handlers::points::get_my_points));

    let admin = Router::new()
        .route("/products", post(handlers::inventory::create_product))
        .route("/products/:id", get(handlers::inventory::get_product))
        .route(
            "/inventory",
            get(handlers::inventory::list_inventory).put(handlers::inventory::set_stock),
        )
        .route("/orders", get(handlers::orders::list_orders))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/orders/:id/ship", post(handlers::orders::ship_order))
        .route("/orders/:id/deliver", post(handlers::orders::deliver_order))
        .route("/orders/:id/tracking", put(handlers::orders::update_tracking))
        .route(
            "/orders/:id/return/approve",
            post(handlers::returns::approve_return),
        )
        .route(
            "/orders/:id/return/complete",
            post(handlers::returns::complete_return),
        )
        .route("/coupons", post(handlers::coupons::create_coupon))
        .route("/coupons/:id/issue", post(handlers::coupons::issue_coupon))
        .route("/points/credit", post(handlers::points::credit_points));

    customer.nest("/admin", admin)
}

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
