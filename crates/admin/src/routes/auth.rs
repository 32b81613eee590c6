//! Back-office login.

use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;
use validator::Validate;

use strives_db::admin_users::AdminUser;

use crate::error::Result;
use crate::extract::ValidJson;
use crate::response::ApiResponse;
use crate::services::auth::AuthService;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Exchange email and password for an admin token.
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<ApiResponse<AdminUser>> {
    let admin = AuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await?;
    let token = state.tokens().issue(admin.id)?;

    tracing::info!(admin_id = %admin.id, "admin logged in");
    Ok(ApiResponse::data(admin).with_token(token))
}
