//! Admin router tests.
//!
//! Tests without `#[ignore]` never reach the database.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use strives_core::{AdminUserId, Email, UserId};
use strives_core::password::hash_password;
use strives_db::AdminUserRepository;
use strives_integration_tests::{
    admin, empty_request, json_request, live_pool, register, send, storefront, unreachable_pool,
};

fn admin_token(state: &strives_admin::state::AppState) -> String {
    state.tokens().issue(AdminUserId::new(1)).unwrap()
}

#[tokio::test]
async fn test_liveness() {
    let (app, _) = admin(unreachable_pool());
    let (status, _) = send(app, empty_request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = admin(unreachable_pool());
    let (status, body) = send(app, empty_request("GET", "/admin/api/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route does not exist.");
}

#[tokio::test]
async fn test_every_listing_requires_token() {
    for uri in [
        "/admin/api/categories",
        "/admin/api/tags",
        "/admin/api/images",
        "/admin/api/products",
        "/admin/api/coupons",
        "/admin/api/orders",
        "/admin/api/test/sms",
    ] {
        let (app, _) = admin(unreachable_pool());
        let (status, _) = send(app, empty_request("GET", uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_customer_token_is_not_an_admin_token() {
    // Both test configs share a secret; only the role claim differs.
    let (_, shop) = storefront(unreachable_pool());
    let customer_token = shop.tokens().issue(UserId::new(1)).unwrap();

    let (app, _) = admin(unreachable_pool());
    let (status, _) = send(
        app,
        empty_request("GET", "/admin/api/orders", Some(&customer_token)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_validates_body() {
    let (app, _) = admin(unreachable_pool());
    let (status, _) = send(
        app,
        json_request(
            "POST",
            "/admin/api/login",
            &json!({"email": "not-an-email", "password": ""}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_colour_hex_is_rejected() {
    let (app, state) = admin(unreachable_pool());
    let token = admin_token(&state);
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/admin/api/colour",
            &json!({"name": "Indigo", "hex": "#12"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid colour hex code.");
}

#[tokio::test]
async fn test_product_prices_are_checked() {
    let (app, state) = admin(unreachable_pool());
    let token = admin_token(&state);
    let (status, _) = send(
        app,
        json_request(
            "POST",
            "/admin/api/product",
            &json!({
                "name": "Kurta",
                "mrp": "999",
                "sp": "1299",
                "stocks_available": 3
            }),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_order_status_is_rejected() {
    let (app, state) = admin(unreachable_pool());
    let token = admin_token(&state);
    let (status, _) = send(
        app,
        json_request(
            "PUT",
            "/admin/api/order/status/1",
            &json!({"status": "shipped-ish"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_coupon_definition_is_rejected() {
    let (app, state) = admin(unreachable_pool());
    let token = admin_token(&state);
    let (status, _) = send(
        app,
        json_request(
            "POST",
            "/admin/api/coupon",
            &json!({"code": "HALF", "discount_kind": "percent", "discount_value": "150"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_test_mail_failure_is_501() {
    let (app, state) = admin(unreachable_pool());
    let token = admin_token(&state);
    let (status, body) = send(app, empty_request("GET", "/admin/api/test/mail", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["status"], false);
    assert_eq!(body["message"], "Error :-/");
}

// ============================================================================
// Database-backed
// ============================================================================

async fn seeded_admin(pool: &sqlx::PgPool) -> (String, String) {
    let email = format!("admin-{}@thestrives.test", uuid::Uuid::new_v4().simple());
    let hash = hash_password("admin-password-1").unwrap();
    AdminUserRepository::new(pool)
        .create("Ops", &Email::parse(&email).unwrap(), &hash)
        .await
        .unwrap();
    (email, "admin-password-1".to_owned())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_login_and_manage_tags() {
    let pool = live_pool().await;
    let (email, password) = seeded_admin(&pool).await;
    let (app, _) = admin(pool);

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/admin/api/login",
            &json!({"email": email, "password": password}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_owned();

    let tag = format!("Summer {}", uuid::Uuid::new_v4().simple());
    let (status, body) = send(
        app.clone(),
        json_request("POST", "/admin/api/tag", &json!({"tag": tag}), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Tag Added Successfully");
    assert!(body["data"]["name"].as_str().unwrap().starts_with("summer-"));
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = send(
        app.clone(),
        json_request("POST", "/admin/api/tag", &json!({"tag": tag}), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        app.clone(),
        empty_request("DELETE", &format!("/admin/api/tag/{id}"), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        empty_request("DELETE", &format!("/admin/api/tag/{id}"), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Tag not found");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_wrong_admin_password() {
    let pool = live_pool().await;
    let (email, _) = seeded_admin(&pool).await;
    let (app, _) = admin(pool);

    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/admin/api/login",
            &json!({"email": email, "password": "not-the-password"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Incorrect Password.");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_category_lifecycle() {
    let pool = live_pool().await;
    let (app, state) = admin(pool);
    let token = admin_token(&state);
    let name = format!("Festive {}", uuid::Uuid::new_v4().simple());

    let (status, body) = send(
        app.clone(),
        json_request("POST", "/admin/api/category", &json!({"name": name}), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/admin/api/sub-category",
            &json!({"category_id": id, "name": "Kurtas"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], "kurtas");

    let (status, _) = send(
        app.clone(),
        empty_request("DELETE", &format!("/admin/api/category/{id}"), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        empty_request("GET", &format!("/admin/api/category/{id}"), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Category not found");
}

async fn seed_order(pool: &sqlx::PgPool, user_id: UserId, status: &str) -> i32 {
    let payment = format!("pay_{}", uuid::Uuid::new_v4().simple());
    sqlx::query_scalar(
        "INSERT INTO strives.customer_order
             (user_id, status, subtotal, discount, total, razorpay_order_id, razorpay_payment_id)
         VALUES ($1, $2::strives.order_status, 1000, 0, 1000, 'order_seeded', $3)
         RETURNING id",
    )
    .bind(user_id)
    .bind(status)
    .bind(payment)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_closed_orders_keep_their_status() {
    let pool = live_pool().await;
    let (shop, _) = storefront(pool.clone());
    let (_, user_id, _) = register(&shop, "long-enough-1").await;
    let delivered = seed_order(&pool, user_id, "delivered").await;
    let dispatched = seed_order(&pool, user_id, "dispatched").await;

    let (app, state) = admin(pool);
    let token = admin_token(&state);
    let set_status = |id: i32, status: &str| {
        json_request(
            "PUT",
            &format!("/admin/api/order/status/{id}"),
            &json!({"status": status}),
            Some(&token),
        )
    };

    let (status, body) = send(app.clone(), set_status(delivered, "dispatched")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Order status can no longer be changed.");

    // Re-saving the current status is allowed.
    let (status, _) = send(app.clone(), set_status(delivered, "delivered")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app.clone(), set_status(dispatched, "cancelled")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, _) = send(app.clone(), set_status(dispatched, "placed")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(app, set_status(i32::MAX, "placed")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
