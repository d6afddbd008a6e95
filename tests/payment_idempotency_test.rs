//! A checkout session is consumed exactly once: replays and races over the
//! same session must yield one order and one stock charge.

mod common;

use axum::http::{Method, StatusCode};
use common::{expect_status, response_json, TestApp};
use serde_json::json;
use uuid::Uuid;

use capstore_api::models::VariantKey;

async fn open_session(app: &TestApp, user: Uuid, product_id: Uuid) -> String {
    let body = expect_status(
        app.request(
            Method::POST,
            "/api/v1/checkout",
            Some(user),
            Some(json!({
                "selection": {
                    "mode": "BUY_NOW",
                    "item": { "product_id": product_id, "quantity": 1, "size": "M" }
                },
                "shipping": {
                    "recipient": "Ada", "address": "1 Cap St", "phone": "010-0000-0000"
                }
            })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    body["data"]["id"].as_str().unwrap().to_string()
}

fn confirm_payload(session_id: &str, payment_key: &str) -> serde_json::Value {
    json!({
        "session_id": session_id,
        "payment_key": payment_key,
        "amount": 40_000
    })
}

#[tokio::test]
async fn replayed_confirmation_returns_the_original_order() {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    let product_id = app.seed_product("Moleskin Cap", 40_000, "M", 5);
    let session_id = open_session(&app, user, product_id).await;

    let first = expect_status(
        app.request(
            Method::POST,
            "/api/v1/payments/confirm",
            Some(user),
            Some(confirm_payload(&session_id, "pay_1")),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;

    // the widget retries after a timeout
    let second = expect_status(
        app.request(
            Method::POST,
            "/api/v1/payments/confirm",
            Some(user),
            Some(confirm_payload(&session_id, "pay_1")),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;

    assert_eq!(first["data"]["id"], second["data"]["id"]);
    let key = VariantKey::new(product_id, Some("M".into()));
    assert_eq!(app.state.services.stock.available(&key).unwrap(), 4);
}

#[tokio::test]
async fn replay_by_another_user_is_forbidden() {
    let app = TestApp::new();
    let buyer = Uuid::new_v4();
    let product_id = app.seed_product("Corduroy Cap", 40_000, "M", 5);
    let session_id = open_session(&app, buyer, product_id).await;

    expect_status(
        app.request(
            Method::POST,
            "/api/v1/payments/confirm",
            Some(buyer),
            Some(confirm_payload(&session_id, "pay_1")),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;

    // another user replaying the consumed session must not receive the
    // buyer's order (shipping details, payment key)
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/confirm",
            Some(Uuid::new_v4()),
            Some(confirm_payload(&session_id, "pay_1")),
        )
        .await;
    let body = expect_status(response, StatusCode::FORBIDDEN).await;
    assert!(!body.to_string().contains("pay_1"));
    assert!(!body.to_string().contains("1 Cap St"));
}

#[tokio::test]
async fn racing_confirmations_create_one_order() {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    let product_id = app.seed_product("Tweed Newsboy", 40_000, "M", 5);
    let session_id = open_session(&app, user, product_id).await;

    let (a, b) = tokio::join!(
        app.request(
            Method::POST,
            "/api/v1/payments/confirm",
            Some(user),
            Some(confirm_payload(&session_id, "pay_a")),
        ),
        app.request(
            Method::POST,
            "/api/v1/payments/confirm",
            Some(user),
            Some(confirm_payload(&session_id, "pay_b")),
        ),
    );
    assert_eq!(a.status(), StatusCode::CREATED);
    assert_eq!(b.status(), StatusCode::CREATED);
    let a = response_json(a).await;
    let b = response_json(b).await;
    assert_eq!(a["data"]["id"], b["data"]["id"]);

    let key = VariantKey::new(product_id, Some("M".into()));
    assert_eq!(app.state.services.stock.available(&key).unwrap(), 4);
    let (_, total) = app.state.services.orders.list_all(None, 0, 10);
    assert_eq!(total, 1);
}
