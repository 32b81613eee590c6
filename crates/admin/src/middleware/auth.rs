//! Admin bearer-token extractor.
//!
//! Used directly by handlers that need the admin's id, and as a route
//! layer (`from_extractor_with_state`) guarding every route but login.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use strives_core::AdminUserId;

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::AuthError;
use crate::state::AppState;

/// The admin authenticated by the request's bearer token.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdminAuth(pub AdminUserId);

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::InvalidToken)?;

        let admin_id = state.tokens().verify(bearer.token())?;
        set_sentry_user(&admin_id);
        tracing::Span::current().record("admin_id", admin_id.as_i32());
        Ok(Self(admin_id))
    }
}
