//! One-time codes sent by SMS or email.

use axum::{extract::State, http::StatusCode};
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{info, instrument};
use validator::Validate;

use strives_core::{Email, OtpChannel, Phone};
use strives_db::otp::OtpCheck;
use strives_db::users::User;
use strives_db::{OtpRepository, UserRepository};
use strives_integrations::messages;
use strives_integrations::otp::{OTP_TTL_MINUTES, generate_otp, hash_otp};

use crate::error::{AppError, Result, ResultExt};
use crate::extract::ValidJson;
use crate::response::ApiResponse;
use crate::services::auth::AuthError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpRequest {
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyOtpRequest {
    pub phone: Option<String>,
    pub email: Option<String>,
    #[validate(length(equal = 6, message = "must be 6 digits"))]
    pub otp: String,
}

/// Where a code goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Phone(Phone),
    Email(Email),
}

impl Destination {
    /// Exactly one of phone and email must be given.
    ///
    /// # Errors
    ///
    /// Returns 400 if both or neither are set or the value is malformed.
    pub fn parse(phone: Option<&str>, email: Option<&str>) -> Result<Self> {
        match (phone, email) {
            (Some(phone), None) => Ok(Self::Phone(Phone::parse(phone).map_err(AuthError::from)?)),
            (None, Some(email)) => Ok(Self::Email(Email::parse(email).map_err(AuthError::from)?)),
            _ => Err(AppError::BadRequest(
                "Provide either a phone number or an email.".to_owned(),
            )),
        }
    }

    fn key(&self) -> &str {
        match self {
            Self::Phone(phone) => phone.as_str(),
            Self::Email(email) => email.as_str(),
        }
    }

    const fn channel(&self) -> OtpChannel {
        match self {
            Self::Phone(_) => OtpChannel::Sms,
            Self::Email(_) => OtpChannel::Email,
        }
    }
}

/// Issue and deliver a 6-digit code valid for 10 minutes.
#[instrument(skip(state, req))]
pub async fn send_otp(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SendOtpRequest>,
) -> Result<ApiResponse<()>> {
    let destination = Destination::parse(req.phone.as_deref(), req.email.as_deref())?;
    let code = generate_otp();

    OtpRepository::new(state.pool())
        .issue(
            destination.key(),
            destination.channel(),
            &hash_otp(&code),
            Utc::now() + Duration::minutes(OTP_TTL_MINUTES),
        )
        .await
        .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error sending OTP")?;

    match &destination {
        Destination::Phone(phone) => state
            .sms()
            .send_reporting(std::slice::from_ref(phone), &messages::otp(&code), "OTP")
            .await
            .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error sending OTP")?,
        Destination::Email(email) => state
            .email()
            .send_otp(email, &code)
            .await
            .or_status(StatusCode::INTERNAL_SERVER_ERROR, "Error sending OTP")?,
    }

    info!(channel = ?destination.channel(), "OTP sent");
    Ok(ApiResponse::message("OTP sent successfully."))
}

/// Check a code. A match marks the owning account's phone or email
/// verified and signs that account in.
#[instrument(skip(state, req))]
pub async fn verify_otp(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<VerifyOtpRequest>,
) -> Result<ApiResponse<Option<User>>> {
    let destination = Destination::parse(req.phone.as_deref(), req.email.as_deref())?;

    let check = OtpRepository::new(state.pool())
        .verify(destination.key(), &hash_otp(&req.otp))
        .await?;
    if check == OtpCheck::Rejected {
        return Err(AppError::BadRequest("Invalid or expired OTP.".to_owned()));
    }

    let users = UserRepository::new(state.pool());
    let user = match &destination {
        Destination::Phone(phone) => users.mark_phone_verified(phone).await?,
        Destination::Email(email) => users.mark_email_verified(email).await?,
    };

    let response = match &user {
        Some(user) => {
            let token = state.tokens().issue(user.id)?;
            ApiResponse::data(Some(user.clone())).with_token(token)
        }
        None => ApiResponse::data(None),
    };
    Ok(response.with_message("OTP verified successfully."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_requires_exactly_one() {
        assert!(Destination::parse(None, None).is_err());
        assert!(Destination::parse(Some("9876543210"), Some("a@b.co")).is_err());
    }

    #[test]
    fn test_phone_destination_is_normalised() {
        let destination = Destination::parse(Some("98765 43210"), None).ok();
        assert_eq!(
            destination.as_ref().map(Destination::key),
            Some("+919876543210")
        );
        assert_eq!(destination.map(|d| d.channel()), Some(OtpChannel::Sms));
    }

    #[test]
    fn test_email_destination() {
        let destination = Destination::parse(None, Some("Shopper@Example.com")).ok();
        assert_eq!(
            destination.as_ref().map(Destination::key),
            Some("shopper@example.com")
        );
    }
}
