//! Registration, login, password management, profile and newsletter.

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use validator::Validate;

use strives_core::Email;
use strives_db::addresses::Address;
use strives_db::users::User;
use strives_db::{AddressRepository, NewsletterRepository, RepositoryError, UserRepository};
use strives_integrations::otp::generate_password;

use crate::error::{AppError, Result, ResultExt};
use crate::extract::ValidJson;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "is required"))]
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "cannot be empty"))]
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// A user with their address, as returned by `GET /user`.
#[derive(Debug, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: User,
    pub address: Option<Address>,
}

/// Create an account and sign in.
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<ApiResponse<User>> {
    let user = AuthService::new(state.pool())
        .register(&req.name, &req.email, req.phone.as_deref(), &req.password)
        .await?;
    let token = state.tokens().issue(user.id)?;

    info!(user_id = %user.id, "user registered");
    Ok(ApiResponse::data(user).with_token(token))
}

/// Sign in with email and password.
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<ApiResponse<User>> {
    let user = AuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await?;
    let token = state.tokens().issue(user.id)?;
    Ok(ApiResponse::data(user).with_token(token))
}

/// Replace the password with a generated one and email it.
///
/// The new password is only committed once the email has gone out, so a
/// failed send leaves the old password working.
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<EmailRequest>,
) -> Result<ApiResponse<()>> {
    let auth = AuthService::new(state.pool());
    let user = auth.find_by_email(&req.email).await?;

    let password = generate_password();
    let pending = auth
        .stage_generated_password(user.id, &password)
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error updating password")?;

    if let Err(e) = state.email().send_new_password(&user.email, &password).await {
        warn!(user_id = %user.id, error = %e, "new password email failed, keeping old password");
        return Err(e).or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error sending email");
    }

    pending
        .commit()
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error updating password")?;
    info!(user_id = %user.id, "password reset by email");
    Ok(ApiResponse::message("A new password has been sent to your email."))
}

/// Set a new password for the signed-in user.
#[instrument(skip(state, req))]
pub async fn reset_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(req): ValidJson<ResetPasswordRequest>,
) -> Result<ApiResponse<()>> {
    match AuthService::new(state.pool())
        .set_password(user_id, &req.password)
        .await
    {
        Ok(()) => Ok(ApiResponse::message("Password updated successfully")),
        Err(e @ AuthError::Password(_)) => Err(e.into()),
        Err(e) => Err(e).or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error updating password"),
    }
}

/// The signed-in user with their address.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<Profile>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User Not Found".to_owned()))?;
    let address = AddressRepository::new(state.pool())
        .get_for_user(user_id)
        .await?;
    Ok(ApiResponse::data(Profile { user, address }))
}

/// Update name and/or phone.
#[instrument(skip(state, req))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ValidJson(req): ValidJson<UpdateUserRequest>,
) -> Result<ApiResponse<User>> {
    const FAILED: &str = "Error Updating Details.";

    let phone = req
        .phone
        .as_deref()
        .map(strives_core::Phone::parse)
        .transpose()
        .or_status(StatusCode::BAD_REQUEST, FAILED)?;

    let user = UserRepository::new(state.pool())
        .update_details(user_id, req.name.as_deref().map(str::trim), phone.as_ref())
        .await
        .or_status(StatusCode::BAD_REQUEST, FAILED)?;

    Ok(ApiResponse::data(user).with_message("Details Updated Successfully."))
}

/// Subscribe an email to the newsletter.
#[instrument(skip(state, req))]
pub async fn subscribe_newsletter(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<EmailRequest>,
) -> Result<ApiResponse<()>> {
    let email = Email::parse(&req.email).map_err(AuthError::from)?;

    match NewsletterRepository::new(state.pool()).subscribe(&email).await {
        Ok(_) => Ok(ApiResponse::message("Successfully added to our newsletter.")),
        Err(RepositoryError::Conflict(_)) => {
            Err(AppError::BadRequest("You've already subscribed.".to_owned()))
        }
        Err(e) => {
            warn!(error = %e, "newsletter subscribe failed");
            Err(e.into())
        }
    }
}
