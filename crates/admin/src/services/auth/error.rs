//! Authentication error types.

use thiserror::Error;

use strives_core::password::PasswordError;
use strives_db::RepositoryError;

/// Errors that can occur during admin authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] strives_core::EmailError),

    #[error("admin not found")]
    UserNotFound,

    #[error("incorrect password")]
    IncorrectPassword,

    #[error("password error: {0}")]
    Password(PasswordError),

    /// Bearer token missing, malformed, expired or not an admin token.
    #[error("invalid token")]
    InvalidToken,

    #[error("token signing failed: {0}")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Mismatch => Self::IncorrectPassword,
            other => Self::Password(other),
        }
    }
}
