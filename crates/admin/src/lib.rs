//! The Strives admin API.
//!
//! Exposed as a library so the router can be driven in-process by the
//! integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::error::AppError;
use crate::state::AppState;

/// Liveness check. Does not touch dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness check: 503 when the database does not answer.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match strives_db::ping(state.pool()).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn root() -> &'static str {
    "API is running\n"
}

async fn fallback() -> impl IntoResponse {
    AppError::status(StatusCode::NOT_FOUND, "Route does not exist.")
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http()
        .make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
                admin_id = tracing::field::Empty,
            )
        })
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(tower_http::LatencyUnit::Millis),
        );

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/admin/api", routes::routes(&state))
        .fallback(fallback)
        .with_state(state)
        .layer(CorsLayer::permissive().max_age(Duration::from_secs(3600)))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(trace)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
