//! Storefront router tests.
//!
//! Tests without `#[ignore]` never reach the database.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use strives_core::{Size, UserId};
use strives_db::CartRepository;
use strives_integration_tests::{
    checkout_signature, empty_request, json_request, live_pool, mock_razorpay, razorpay_order,
    register, seed_flat_coupon, seed_product, send, storefront, storefront_with_razorpay,
    unique_email, unreachable_pool,
};

#[tokio::test]
async fn test_root_and_liveness() {
    let (app, _) = storefront(unreachable_pool());
    let response = send(app.clone(), empty_request("GET", "/health", None)).await;
    assert_eq!(response.0, StatusCode::OK);

    let response = send(app, empty_request("GET", "/", None)).await;
    assert_eq!(response.0, StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_fails_without_database() {
    let (app, _) = storefront(unreachable_pool());
    let (status, _) = send(app, empty_request("GET", "/health/ready", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let (app, _) = storefront(unreachable_pool());
    let (status, body) = send(app, empty_request("GET", "/api/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route does not exist.");
}

#[tokio::test]
async fn test_cart_requires_token() {
    let (app, _) = storefront(unreachable_pool());
    let (status, body) = send(app, empty_request("GET", "/api/cart", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let (app, _) = storefront(unreachable_pool());
    let (status, _) = send(app, empty_request("GET", "/api/favourites", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_payment_credentials_return_public_key_only() {
    let (app, state) = storefront(unreachable_pool());
    let token = state.tokens().issue(UserId::new(7)).unwrap();

    let (status, body) = send(
        app,
        empty_request("GET", "/api/payment/credentials", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["key_id"], "rzp_test_key");
    assert!(body["data"].get("key_secret").is_none());
}

#[tokio::test]
async fn test_register_validates_before_touching_database() {
    let (app, _) = storefront(unreachable_pool());
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/register",
            &json!({"name": "", "email": "asha@example.com", "password": "long-enough-1"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, state) = storefront(unreachable_pool());
    let token = state.tokens().issue(UserId::new(7)).unwrap();
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/cart")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(axum::body::Body::from("{\"productId\":"))
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_product_filters_are_checked_first() {
    let (app, _) = storefront(unreachable_pool());
    let (status, _) = send(app, empty_request("GET", "/api/products?min=cheap", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (app, _) = storefront(unreachable_pool());
    let (status, _) = send(app, empty_request("GET", "/api/products?min=900&max=100", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_otp_needs_exactly_one_destination() {
    let (app, _) = storefront(unreachable_pool());
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/otp/send",
            &json!({"phone": "9876543210", "email": "asha@example.com"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Provide either a phone number or an email.");
}

// ============================================================================
// Database-backed
// ============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_register_then_login() {
    let (app, _) = storefront(live_pool().await);
    let email = unique_email();

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/register",
            &json!({"name": "Asha", "email": email, "password": "long-enough-1"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());
    assert!(body["data"].get("password_hash").is_none());

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/login",
            &json!({"email": email, "password": "long-enough-1"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], email.as_str());

    let (status, _) = send(
        app,
        json_request(
            "POST",
            "/api/login",
            &json!({"email": email, "password": "wrong-password"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_empty_cart_and_wishlist_for_new_user() {
    let (app, _) = storefront(live_pool().await);
    let (_, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/register",
            &json!({"name": "Ravi", "email": unique_email(), "password": "long-enough-1"}),
            None,
        ),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_owned();

    let (status, body) = send(app.clone(), empty_request("GET", "/api/cart", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    let (status, body) = send(app, empty_request("GET", "/api/favourites", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_failed_password_email_keeps_old_password() {
    let (app, _) = storefront(live_pool().await);
    let (_, _, email) = register(&app, "long-enough-1").await;

    // The test SMTP relay refuses connections.
    let (status, body) = send(
        app.clone(),
        json_request("POST", "/api/forgot-password", &json!({"email": email}), None),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error sending email");

    let (status, _) = send(
        app,
        json_request(
            "POST",
            "/api/login",
            &json!({"email": email, "password": "long-enough-1"}),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_address_is_created_and_linked_once() {
    let (app, _) = storefront(live_pool().await);
    let (token, _, _) = register(&app, "long-enough-1").await;
    let address = json!({
        "name": "Asha Rao",
        "phone": "9876543210",
        "line1": "12 MG Road",
        "city": "Bengaluru",
        "state": "Karnataka",
        "pincode": "560001"
    });

    let (status, _) = send(app.clone(), empty_request("GET", "/api/address", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        app.clone(),
        json_request("POST", "/api/address", &address, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Address added successfully");

    let (status, body) = send(app.clone(), empty_request("GET", "/api/user", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["address"]["city"], "Bengaluru");

    let (status, _) = send(
        app.clone(),
        json_request("POST", "/api/address", &address, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut moved = address.clone();
    moved["city"] = json!("Mysuru");
    let (status, body) = send(
        app.clone(),
        json_request("PUT", "/api/address", &moved, Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Address updated successfully");

    let (_, body) = send(app, empty_request("GET", "/api/address", Some(&token))).await;
    assert_eq!(body["data"]["city"], "Mysuru");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cart_sets_quantity_of_matching_line() {
    let pool = live_pool().await;
    let product = seed_product(&pool, "1200", false).await;
    let (app, _) = storefront(pool);
    let (token, _, _) = register(&app, "long-enough-1").await;

    for (quantity, size) in [(2, "M"), (5, "M"), (1, "L")] {
        let (status, _) = send(
            app.clone(),
            json_request(
                "POST",
                "/api/cart",
                &json!({"productId": product.as_i32(), "quantity": quantity, "size": size}),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(app, empty_request("GET", "/api/cart", Some(&token))).await;
    let lines = body["data"].as_array().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["size"], "M");
    assert_eq!(lines[0]["quantity"], 5);
    assert_eq!(lines[1]["size"], "L");
    assert_eq!(lines[1]["quantity"], 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_cart_adds_are_not_lost() {
    let pool = live_pool().await;
    let product = seed_product(&pool, "800", false).await;
    let (app, _) = storefront(pool.clone());
    let (_, user_id, _) = register(&app, "long-enough-1").await;

    let sizes = ["XS", "S", "M", "L", "XL", "XXL", "28", "30"];
    let mut tasks = tokio::task::JoinSet::new();
    for (i, size) in sizes.into_iter().enumerate() {
        let pool = pool.clone();
        tasks.spawn(async move {
            let quantity = u32::try_from(i + 1).unwrap();
            CartRepository::new(&pool)
                .upsert(user_id, product, Size::parse(size).unwrap(), quantity)
                .await
        });
    }
    // Same line from every task: exactly one row survives.
    for quantity in 1..=8 {
        let pool = pool.clone();
        tasks.spawn(async move {
            CartRepository::new(&pool)
                .upsert(user_id, product, Size::free(), quantity)
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    let lines = CartRepository::new(&pool).list(user_id).await.unwrap();
    assert_eq!(lines.len(), sizes.len() + 1);
    let free: Vec<_> = lines.iter().filter(|l| l.size == Size::free()).collect();
    assert_eq!(free.len(), 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_blocked_product_cannot_be_added_to_cart() {
    let pool = live_pool().await;
    let blocked = seed_product(&pool, "999", true).await;
    let visible = seed_product(&pool, "999", false).await;
    let (app, _) = storefront(pool);
    let (token, _, _) = register(&app, "long-enough-1").await;

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/cart",
            &json!({"productId": blocked.as_i32()}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");

    let (status, _) = send(
        app.clone(),
        json_request(
            "PUT",
            "/api/cart",
            &json!([{"productId": visible.as_i32()}, {"productId": blocked.as_i32()}]),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(app, empty_request("GET", "/api/cart", Some(&token))).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

async fn add_to_cart(app: &axum::Router, token: &str, product: strives_core::ProductId, quantity: u32) {
    let (status, _) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/cart",
            &json!({"productId": product.as_i32(), "quantity": quantity, "size": "M"}),
            Some(token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

fn order_body(order_id: &str, payment_id: &str, coupon: Option<&str>) -> serde_json::Value {
    json!({
        "coupon": coupon,
        "razorpay_order_id": order_id,
        "razorpay_payment_id": payment_id,
        "razorpay_signature": checkout_signature(order_id, payment_id),
    })
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_payment_order_is_priced_from_cart() {
    let pool = live_pool().await;
    let product = seed_product(&pool, "5000", false).await;
    let razorpay = mock_razorpay(Vec::new()).await;
    let (app, _) = storefront_with_razorpay(pool, &razorpay);
    let (token, _, _) = register(&app, "long-enough-1").await;
    add_to_cart(&app, &token, product, 2).await;

    let (status, body) = send(
        app.clone(),
        json_request("POST", "/api/payment/order", &json!({"amount": "1"}), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Order amount does not match your cart.");

    let (status, body) = send(
        app,
        json_request("POST", "/api/payment/order", &json!({}), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["amount"], 1_000_000);
    assert_eq!(body["quote"]["total"], "10000.00");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_underpaid_order_is_rejected() {
    let pool = live_pool().await;
    let product = seed_product(&pool, "5000", false).await;
    let razorpay = mock_razorpay(vec![
        razorpay_order("order_one_rupee", 100, 100, "paid"),
        razorpay_order("order_unpaid", 1_000_000, 0, "attempted"),
    ])
    .await;
    let (app, _) = storefront_with_razorpay(pool, &razorpay);
    let (token, _, _) = register(&app, "long-enough-1").await;
    add_to_cart(&app, &token, product, 2).await;

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/order",
            &order_body("order_one_rupee", "pay_one_rupee", None),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Payment amount does not match the order total.");

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/order",
            &order_body("order_unpaid", "pay_unpaid", None),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Payment has not been completed.");

    let (_, body) = send(app, empty_request("GET", "/api/cart", Some(&token))).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_empty_cart_cannot_be_ordered() {
    let razorpay = mock_razorpay(vec![razorpay_order("order_empty", 50_000, 50_000, "paid")]).await;
    let (app, _) = storefront_with_razorpay(live_pool().await, &razorpay);
    let (token, _, _) = register(&app, "long-enough-1").await;

    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/order",
            &order_body("order_empty", "pay_empty", None),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Your cart is empty.");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_order_redeems_coupon_and_clears_cart() {
    let pool = live_pool().await;
    let product = seed_product(&pool, "5000", false).await;
    let coupon = seed_flat_coupon(&pool, "500", 1).await;
    // 2 x 5000 less the flat 500.
    let razorpay = mock_razorpay(vec![
        razorpay_order("order_with_coupon", 950_000, 950_000, "paid"),
        razorpay_order("order_again", 1_000_000, 1_000_000, "paid"),
    ])
    .await;
    let (app, _) = storefront_with_razorpay(pool.clone(), &razorpay);
    let (token, user_id, _) = register(&app, "long-enough-1").await;
    add_to_cart(&app, &token, product, 2).await;

    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/order",
            &order_body("order_with_coupon", "pay_with_coupon", Some(&coupon)),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total"], "9500.00");
    assert_eq!(body["data"]["discount"], "500.00");
    assert_eq!(body["data"]["items"][0]["quantity"], 2);
    let order_id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = send(app.clone(), empty_request("GET", "/api/cart", Some(&token))).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    let times_used: i32 =
        sqlx::query_scalar("SELECT times_used FROM strives.coupon WHERE code = $1")
            .bind(&coupon)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(times_used, 1);
    let redeemed_order: Option<i32> = sqlx::query_scalar(
        "SELECT r.order_id FROM strives.coupon_redemption r
         JOIN strives.coupon c ON c.id = r.coupon_id
         WHERE c.code = $1 AND r.user_id = $2",
    )
    .bind(&coupon)
    .bind(user_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(redeemed_order.map(i64::from), Some(order_id));

    // The coupon allows one use per customer.
    let (status, body) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/coupon/check",
            &json!({"code": coupon, "amount": "10000"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You have already used this coupon.");

    add_to_cart(&app, &token, product, 2).await;
    let (status, _) = send(
        app.clone(),
        json_request(
            "POST",
            "/api/order",
            &order_body("order_again", "pay_with_coupon", None),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(app, empty_request("GET", "/api/orders", Some(&token))).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}
