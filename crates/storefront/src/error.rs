//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. The `IntoResponse` impl maps
//! each failure to a fixed status and message and renders
//! `{"message": …, "stack"?: …}`. The `stack` (error chain) is only
//! included outside production.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use strives_core::coupon::CouponRejection;
use strives_core::password::PasswordError;
use strives_db::RepositoryError;

use crate::services::auth::AuthError;

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Include the internal error chain in error bodies.
pub fn expose_error_details(enabled: bool) {
    EXPOSE_DETAILS.store(enabled, Ordering::Relaxed);
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A handler-chosen status and message, wrapping the underlying cause.
    #[error("{message}")]
    Status {
        status: StatusCode,
        message: Cow<'static, str>,
        #[source]
        source: Option<BoxError>,
    },

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Coupon failed an eligibility check.
    #[error(transparent)]
    Coupon(#[from] CouponRejection),

    /// Request body failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A fixed status and message with no underlying cause.
    pub fn status(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self::Status {
            status,
            message: message.into(),
            source: None,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Status { status, .. } => *status,
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::IncorrectPassword | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::UserAlreadyExists
                | AuthError::InvalidEmail(_)
                | AuthError::InvalidPhone(_)
                | AuthError::Password(PasswordError::TooShort { .. }) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Coupon(rejection) => match rejection {
                CouponRejection::NotFound => StatusCode::NOT_FOUND,
                CouponRejection::BelowMinimum { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CouponRejection::Exhausted => StatusCode::CONFLICT,
                CouponRejection::UserLimitReached => StatusCode::FORBIDDEN,
                CouponRejection::Expired => StatusCode::GONE,
            },
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    // Don't expose internal error details in the message
    fn public_message(&self) -> Cow<'static, str> {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Database(RepositoryError::NotFound) => "Not found.".into(),
            Self::Database(RepositoryError::Conflict(what)) => format!("{what}.").into(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".into(),
            Self::Auth(err) => match err {
                AuthError::UserNotFound => "User not found.".into(),
                AuthError::IncorrectPassword => "Incorrect Password.".into(),
                AuthError::UserAlreadyExists => "User already exists.".into(),
                AuthError::InvalidEmail(_) => "Invalid email address.".into(),
                AuthError::InvalidPhone(_) => "Invalid phone number.".into(),
                AuthError::Password(PasswordError::TooShort { min }) => {
                    format!("Password must be at least {min} characters.").into()
                }
                AuthError::InvalidToken => "Unauthorized".into(),
                _ => "Authentication error".into(),
            },
            Self::Coupon(rejection) => rejection.to_string().into(),
            Self::Validation(errors) => validation_message(errors).into(),
            Self::NotFound(m) | Self::Unauthorized(m) | Self::BadRequest(m) => m.clone().into(),
            Self::RateLimited => "Too many requests.".into(),
        }
    }
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let detail = errs
                .iter()
                .find_map(|e| e.message.as_ref().map(ToString::to_string))
                .unwrap_or_else(|| "is invalid".to_owned());
            format!("{field} {detail}")
        })
        .collect();
    fields.sort();
    format!("Invalid request: {}.", fields.join(", "))
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str("\ncaused by: ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

#[derive(Serialize)]
struct ErrorBody {
    message: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %error_chain(&self),
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, %status, "Request rejected");
        }

        let body = ErrorBody {
            message: self.public_message(),
            stack: EXPOSE_DETAILS
                .load(Ordering::Relaxed)
                .then(|| error_chain(&self)),
        };

        (status, Json(body)).into_response()
    }
}

/// Attach a fixed status and message to any error.
pub trait ResultExt<T> {
    /// Map the error to `status` with `message`, keeping it as the source.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Status` when `self` is an error.
    fn or_status(self, status: StatusCode, message: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn or_status(self, status: StatusCode, message: &'static str) -> Result<T> {
        self.map_err(|e| AppError::Status {
            status,
            message: Cow::Borrowed(message),
            source: Some(Box::new(e)),
        })
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use rust_decimal::Decimal;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");
    }

    #[tokio::test]
    async fn test_auth_error_mapping() {
        let (status, body) = render(AuthError::UserNotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found.");

        let (status, body) = render(AuthError::IncorrectPassword.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Incorrect Password.");

        let (status, body) = render(AuthError::UserAlreadyExists.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "User already exists.");
    }

    #[tokio::test]
    async fn test_coupon_rejection_statuses() {
        let cases = [
            (CouponRejection::NotFound, StatusCode::NOT_FOUND),
            (
                CouponRejection::BelowMinimum {
                    min: Decimal::new(500, 0),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CouponRejection::Exhausted, StatusCode::CONFLICT),
            (CouponRejection::UserLimitReached, StatusCode::FORBIDDEN),
            (CouponRejection::Expired, StatusCode::GONE),
        ];
        for (rejection, expected) in cases {
            let message = rejection.to_string();
            let (status, body) = render(rejection.into()).await;
            assert_eq!(status, expected);
            assert_eq!(body["message"], message);
        }
    }

    #[tokio::test]
    async fn test_or_status_keeps_fixed_message() {
        let failed: std::result::Result<(), RepositoryError> =
            Err(RepositoryError::DataCorruption("bad row".to_owned()));
        let err = failed
            .or_status(StatusCode::BAD_GATEWAY, "Error adding product to cart")
            .unwrap_err();
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["message"], "Error adding product to cart");
    }

    #[tokio::test]
    async fn test_stack_toggle() {
        expose_error_details(true);
        let (_, body) = render(AppError::Internal("boom".to_owned())).await;
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["stack"], "Internal error: boom");

        expose_error_details(false);
        let (_, body) = render(AppError::Internal("boom".to_owned())).await;
        assert!(body.get("stack").is_none());
    }
}
