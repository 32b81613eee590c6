//! HTTP route handlers for the storefront API, mounted under `/api`.
//!
//! # Route Structure
//!
//! ```text
//! # Account (rate limited)
//! POST   /register                 - Create account, returns token
//! POST   /login                    - Sign in, returns token
//! POST   /forgot-password          - Email a generated password
//! POST   /otp/send                 - Send a code by SMS or email
//! POST   /otp/verify               - Check a code
//!
//! # Account (auth)
//! PUT    /reset-password           - Change password
//! GET    /user                     - Profile with address
//! PUT    /user                     - Update name/phone
//! POST   /address                  - Create address
//! PUT    /address                  - Replace address
//! GET    /address                  - Get address
//! POST   /newsletter               - Subscribe (no auth)
//!
//! # Catalog
//! GET    /products                 - Filtered listing
//! GET    /product/{id}             - Product with gallery
//! GET    /categories, /sub-categories, /collections, /collection/{id},
//!        /colours, /materials, /tags
//!
//! # Favourites, cart, coupons, checkout (auth)
//! GET    /favourites               PUT/DELETE /favourites/{id}   DELETE /favourites
//! GET    /cart    POST /cart       PUT /cart    DELETE /cart     DELETE /cart/{id}?size=
//! POST   /coupon/check
//! GET    /payment/credentials      POST /payment/order
//! POST   /order                    GET  /orders
//! ```

pub mod account;
pub mod address;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod coupons;
pub mod favourites;
pub mod otp;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Routes that hand out credentials, behind a per-IP limiter.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(account::register))
        .route("/login", post(account::login))
        .route("/forgot-password", post(account::forgot_password))
        .route("/otp/send", post(otp::send_otp))
        .route("/otp/verify", post(otp::verify_otp))
        .layer(auth_rate_limiter())
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/reset-password", put(account::reset_password))
        .route("/user", get(account::get_user).put(account::update_user))
        .route(
            "/address",
            get(address::get_address)
                .post(address::create_address)
                .put(address::update_address),
        )
        .route("/newsletter", post(account::subscribe_newsletter))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::list_products))
        .route("/product/{id}", get(catalog::get_product))
        .route("/categories", get(catalog::list_categories))
        .route("/sub-categories", get(catalog::list_sub_categories))
        .route("/collections", get(catalog::list_collections))
        .route("/collection/{id}", get(catalog::get_collection))
        .route("/colours", get(catalog::list_colours))
        .route("/materials", get(catalog::list_materials))
        .route("/tags", get(catalog::list_tags))
}

/// Create the favourites and cart routes router.
pub fn basket_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/favourites",
            get(favourites::list_favourites).delete(favourites::clear_favourites),
        )
        .route(
            "/favourites/{id}",
            put(favourites::add_favourite).delete(favourites::remove_favourite),
        )
        .route(
            "/cart",
            get(cart::get_cart)
                .post(cart::add_to_cart)
                .put(cart::replace_cart)
                .delete(cart::clear_cart),
        )
        .route("/cart/{id}", axum::routing::delete(cart::remove_from_cart))
}

/// Create the coupon, payment and order routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/coupon/check", post(coupons::check_coupon))
        .route("/payment/credentials", get(checkout::payment_credentials))
        .route("/payment/order", post(checkout::create_payment_order))
        .route("/order", post(checkout::place_order))
        .route("/orders", get(checkout::list_orders))
}

/// Create all routes for the storefront API.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(account_routes())
        .merge(catalog_routes())
        .merge(basket_routes())
        .merge(checkout_routes())
}
