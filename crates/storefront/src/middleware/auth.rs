//! Bearer-token authentication extractor.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use strives_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// The customer authenticated by the request's bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(AuthUser(user_id): AuthUser) -> impl IntoResponse {
///     format!("Hello, {user_id}!")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub UserId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized("Unauthorized".to_owned()))?;

        let user_id = state.tokens().verify(bearer.token())?;
        set_sentry_user(&user_id);
        tracing::Span::current().record("user_id", user_id.as_i32());
        Ok(Self(user_id))
    }
}
