use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use capstore_api::config::AppConfig;
use capstore_api::events::{process_events, EventSender};
use capstore_api::models::Money;
use capstore_api::services::catalog::VariantInput;
use capstore_api::services::coupons::CreateCouponInput;
use capstore_api::{app, AppState};

/// Harness wrapping the full router over fresh in-memory state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(256);
        let event_task = tokio::spawn(process_events(rx));
        let state = AppState::new(AppConfig::default(), Arc::new(EventSender::new(tx)));
        let router = app(state.clone());
        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Sends one request through the router. `user` populates the identity
    /// header customer endpoints require.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        user: Option<Uuid>,
        json_body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(user_id) = user {
            builder = builder.header("x-user-id", user_id.to_string());
        }
        let request = match json_body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Registers a product with one sized variant and returns its id.
    pub fn seed_product(&self, name: &str, unit_price: Money, size: &str, quantity: i64) -> Uuid {
        self.state
            .services
            .catalog
            .create_product(
                name,
                unit_price,
                vec![VariantInput {
                    size: Some(size.to_string()),
                    quantity,
                }],
            )
            .expect("seed product")
            .id
    }

    pub fn grant_points(&self, user_id: Uuid, amount: Money) {
        self.state
            .services
            .points
            .credit(user_id, amount)
            .expect("grant points");
    }

    /// Creates a percentage coupon and issues one instance to the user,
    /// returning the held instance id.
    pub fn issue_percentage_coupon(
        &self,
        user_id: Uuid,
        percent: i64,
        cap: Option<Money>,
    ) -> Uuid {
        let coupon = self
            .state
            .services
            .coupons
            .create_coupon(CreateCouponInput {
                name: format!("{percent}% off"),
                code: format!("PCT{percent}"),
                kind: capstore_api::models::CouponKind::Percentage,
                discount_value: percent,
                min_order_amount: None,
                max_discount_amount: cap,
                valid_from: None,
                valid_until: None,
                reusable: false,
            })
            .expect("create coupon");
        self.state
            .services
            .coupons
            .issue(user_id, coupon.id)
            .expect("issue coupon")
            .id
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn expect_status(response: Response, status: StatusCode) -> Value {
    assert_eq!(response.status(), status, "unexpected status");
    response_json(response).await
}
