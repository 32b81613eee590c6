//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Missing entities map to 404
//! "{Entity} not found", duplicates to 409, and anything else to 500 with
//! the handler's "Error ..." message.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use strives_db::RepositoryError;

use crate::services::auth::AuthError;

static EXPOSE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Include the internal error chain in error bodies.
pub fn expose_error_details(enabled: bool) {
    EXPOSE_DETAILS.store(enabled, Ordering::Relaxed);
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Application-level error type for admin.
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

    /// Authentication failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Request body failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
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
            Self::Auth(err) => match err {
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::IncorrectPassword | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn public_message(&self) -> Cow<'static, str> {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Auth(err) => match err {
                AuthError::UserNotFound => "User not found.".into(),
                AuthError::IncorrectPassword => "Incorrect Password.".into(),
                AuthError::InvalidEmail(_) => "Invalid email address.".into(),
                AuthError::InvalidToken => "Unauthorized".into(),
                _ => "Authentication error".into(),
            },
            Self::Validation(errors) => validation_message(errors).into(),
            Self::BadRequest(m) => m.clone().into(),
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

/// Attach a status and message to a failed result.
pub trait ResultExt<T> {
    /// Any failure becomes `status` with `message`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Status` wrapping the original error.
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

/// Map repository failures for one kind of entity.
pub trait EntityResultExt<T> {
    /// `NotFound` becomes 404 "{entity} not found", `Conflict` becomes 409
    /// "{entity} already exists" and anything else 500 with `failure`.
    ///
    /// # Errors
    ///
    /// Returns the mapped `AppError`.
    fn or_entity(self, entity: &'static str, failure: &'static str) -> Result<T>;
}

impl<T> EntityResultExt<T> for std::result::Result<T, RepositoryError> {
    fn or_entity(self, entity: &'static str, failure: &'static str) -> Result<T> {
        self.map_err(|e| {
            let (status, message): (StatusCode, Cow<'static, str>) = match &e {
                RepositoryError::NotFound => {
                    (StatusCode::NOT_FOUND, format!("{entity} not found").into())
                }
                RepositoryError::Conflict(_) => {
                    (StatusCode::CONFLICT, format!("{entity} already exists").into())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, failure.into()),
            };
            AppError::Status {
                status,
                message,
                source: Some(Box::new(e)),
            }
        })
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an admin ID.
pub fn set_sentry_user(admin_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_entity_is_404_with_name() {
        let err = Err::<(), _>(RepositoryError::NotFound)
            .or_entity("Category", "Error fetching category")
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "Category not found");
    }

    #[test]
    fn test_duplicate_entity_is_409() {
        let err = Err::<(), _>(RepositoryError::Conflict("tag".to_owned()))
            .or_entity("Tag", "Error adding tag")
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_other_failures_use_handler_message() {
        let err = Err::<(), _>(RepositoryError::DataCorruption("x".to_owned()))
            .or_entity("Coupon", "Error updating coupon")
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Error updating coupon");
    }

    #[test]
    fn test_validation_message_lists_fields_in_order() {
        use validator::Validate;

        #[derive(Validate)]
        struct Login {
            #[validate(email(message = "must be a valid email"))]
            email: String,
            #[validate(length(min = 1))]
            password: String,
        }

        let errors = Login {
            email: "not-an-email".to_owned(),
            password: String::new(),
        }
        .validate()
        .unwrap_err();
        let err = AppError::Validation(errors);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.public_message(),
            "Invalid request: email must be a valid email, password is invalid."
        );
    }

    #[test]
    fn test_login_failures() {
        assert_eq!(
            AppError::Auth(AuthError::IncorrectPassword).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::UserNotFound).public_message(),
            "User not found."
        );
    }
}
