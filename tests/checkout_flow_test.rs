//! End-to-end purchase flow: checkout session, price quote, payment
//! confirmation and the resulting order.

mod common;

use axum::http::{Method, StatusCode};
use common::{expect_status, TestApp};
use serde_json::json;
use uuid::Uuid;

use capstore_api::models::VariantKey;

fn checkout_payload(product_id: Uuid, quantity: i64) -> serde_json::Value {
    json!({
        "selection": {
            "mode": "BUY_NOW",
            "item": { "product_id": product_id, "quantity": quantity, "size": "M" }
        },
        "shipping": {
            "recipient": "Ada Lovelace",
            "address": "1 Cap Street",
            "phone": "010-1234-5678"
        }
    })
}

#[tokio::test]
async fn full_purchase_flow_with_coupon_and_points() {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    let product_id = app.seed_product("Herringbone Flat Cap", 50_000, "M", 10);
    app.grant_points(user, 10_000);
    let user_coupon_id = app.issue_percentage_coupon(user, 10, None);

    // open the session
    let body = expect_status(
        app.request(
            Method::POST,
            "/api/v1/checkout",
            Some(user),
            Some(checkout_payload(product_id, 2)),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let session_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["total_price"], 100_000);

    // live quote: 10% coupon plus 5,000 points
    let quote = expect_status(
        app.request(
            Method::GET,
            &format!(
                "/api/v1/checkout/{session_id}/quote?user_coupon_id={user_coupon_id}&points_to_redeem=5000"
            ),
            Some(user),
            None,
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(quote["data"]["coupon_discount"], 10_000);
    assert_eq!(quote["data"]["points_redeemed"], 5_000);
    assert_eq!(quote["data"]["total"], 85_000);

    // a stale client total is rejected without charging anything
    let mismatch = app
        .request(
            Method::POST,
            "/api/v1/payments/confirm",
            Some(user),
            Some(json!({
                "session_id": session_id,
                "payment_key": "pay_stale",
                "amount": 80_000,
                "user_coupon_id": user_coupon_id,
                "points_to_redeem": 5_000
            })),
        )
        .await;
    let mismatch_body = expect_status(mismatch, StatusCode::PAYMENT_REQUIRED).await;
    // the wire message must not reveal the server-side amount
    assert!(!mismatch_body["message"].as_str().unwrap().contains("85000"));

    // the correct amount goes through
    let order = expect_status(
        app.request(
            Method::POST,
            "/api/v1/payments/confirm",
            Some(user),
            Some(json!({
                "session_id": session_id,
                "payment_key": "pay_ok",
                "amount": 85_000,
                "user_coupon_id": user_coupon_id,
                "points_to_redeem": 5_000
            })),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(order["data"]["status"], "ORDERED");
    assert_eq!(order["data"]["total_amount"], 85_000);
    assert_eq!(order["data"]["subtotal"], 100_000);

    // side effects: stock down, points spent, coupon consumed
    let key = VariantKey::new(product_id, Some("M".into()));
    assert_eq!(app.state.services.stock.available(&key).unwrap(), 8);
    assert_eq!(app.state.services.points.balance(user), 5_000);
    assert!(app
        .state
        .services
        .coupons
        .validate_for_user(user_coupon_id, user)
        .is_err());

    // the order shows up in the customer's history
    let listed = expect_status(
        app.request(Method::GET, "/api/v1/orders", Some(user), None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_selection_cannot_open_a_session() {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    app.seed_product("Wool Beanie", 20_000, "M", 5);

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(user),
            Some(json!({
                "selection": { "mode": "CART", "items": [] },
                "shipping": {
                    "recipient": "Ada", "address": "1 Cap St", "phone": "010-0000-0000"
                }
            })),
        )
        .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn checkout_requires_identity() {
    let app = TestApp::new();
    let product_id = app.seed_product("Trapper Hat", 60_000, "M", 5);
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            None,
            Some(checkout_payload(product_id, 1)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn another_users_session_is_off_limits() {
    let app = TestApp::new();
    let owner = Uuid::new_v4();
    let product_id = app.seed_product("Baker Boy Cap", 30_000, "M", 5);

    let body = expect_status(
        app.request(
            Method::POST,
            "/api/v1/checkout",
            Some(owner),
            Some(checkout_payload(product_id, 1)),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let session_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/checkout/{session_id}"),
            Some(Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn oversized_selection_is_blocked_at_checkout() {
    let app = TestApp::new();
    let user = Uuid::new_v4();
    let product_id = app.seed_product("Straw Boater", 45_000, "M", 2);

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            Some(user),
            Some(checkout_payload(product_id, 3)),
        )
        .await;
    let body = expect_status(response, StatusCode::CONFLICT).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("requested 3"));
    assert!(message.contains("available 2"));
}
