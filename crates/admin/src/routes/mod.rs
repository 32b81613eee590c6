//! HTTP route handlers for the admin API, mounted under `/admin/api`.
//!
//! Every route except `POST /login` requires an admin bearer token.
//!
//! # Route Structure
//!
//! ```text
//! POST   /login
//!
//! # Taxonomy
//! POST /category        GET /categories       GET|PUT|DELETE /category/{id}
//! POST /sub-category    GET /sub-categories   GET|PUT|DELETE /sub-category/{id}
//! POST /tag             GET /tags             DELETE /tag/{id}
//! POST /material        GET /materials        DELETE /material/{id}
//! POST /colour          GET /colours          DELETE /colour/{id}
//! POST /collection      GET /collections      GET|PUT|DELETE /collection/{id}
//!
//! # Assets (10 MiB body limit)
//! POST /image           GET /images           DELETE /image/{id}
//! PUT  /product-images/{id}
//!
//! # Products
//! POST /product         GET /products         GET /products-num
//! GET|PUT|DELETE /product/{id}                PUT /product/status/{id}
//!
//! # Coupons and orders
//! POST /coupon          GET /coupons          PUT|DELETE /coupon/{id}
//! GET  /orders          PUT /order/status/{id}
//!
//! # Diagnostics
//! GET  /test/sms        GET /test/mail
//! ```

pub mod attributes;
pub mod auth;
pub mod categories;
pub mod collections;
pub mod coupons;
pub mod diagnostics;
pub mod images;
pub mod orders;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_extractor_with_state,
    routing::{delete, get, post, put},
};

use crate::middleware::RequireAdminAuth;
use crate::services::uploads::MAX_UPLOAD_BYTES;
use crate::state::AppState;

fn taxonomy_routes() -> Router<AppState> {
    Router::new()
        .route("/category", post(categories::create_category))
        .route("/categories", get(categories::list_categories))
        .route(
            "/category/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/sub-category", post(categories::create_sub_category))
        .route("/sub-categories", get(categories::list_sub_categories))
        .route(
            "/sub-category/{id}",
            get(categories::get_sub_category)
                .put(categories::update_sub_category)
                .delete(categories::delete_sub_category),
        )
        .route("/tag", post(attributes::create_tag))
        .route("/tags", get(attributes::list_tags))
        .route("/tag/{id}", delete(attributes::delete_tag))
        .route("/material", post(attributes::create_material))
        .route("/materials", get(attributes::list_materials))
        .route("/material/{id}", delete(attributes::delete_material))
        .route("/colour", post(attributes::create_colour))
        .route("/colours", get(attributes::list_colours))
        .route("/colour/{id}", delete(attributes::delete_colour))
        .route("/collection", post(collections::create_collection))
        .route("/collections", get(collections::list_collections))
        .route(
            "/collection/{id}",
            get(collections::get_collection)
                .put(collections::update_collection)
                .delete(collections::delete_collection),
        )
}

fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/image", post(images::upload_image))
        .route("/product-images/{id}", put(products::upload_product_images))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/images", get(images::list_images))
        .route("/image/{id}", delete(images::delete_image))
        .route("/product", post(products::create_product))
        .route("/products", get(products::list_products))
        .route("/products-num", get(products::count_products))
        .route(
            "/product/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/product/status/{id}", put(products::set_product_status))
}

fn sales_routes() -> Router<AppState> {
    Router::new()
        .route("/coupon", post(coupons::create_coupon))
        .route("/coupons", get(coupons::list_coupons))
        .route(
            "/coupon/{id}",
            put(coupons::update_coupon).delete(coupons::delete_coupon),
        )
        .route("/orders", get(orders::list_orders))
        .route("/order/status/{id}", put(orders::update_order_status))
}

fn diagnostic_routes() -> Router<AppState> {
    Router::new()
        .route("/test/sms", get(diagnostics::test_sms))
        .route("/test/mail", get(diagnostics::test_mail))
}

/// Build the admin API router.
pub fn routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(taxonomy_routes())
        .merge(upload_routes())
        .merge(catalog_routes())
        .merge(sales_routes())
        .merge(diagnostic_routes())
        .route_layer(from_extractor_with_state::<RequireAdminAuth, _>(
            state.clone(),
        ));

    Router::new()
        .route("/login", post(auth::login))
        .merge(protected)
}
