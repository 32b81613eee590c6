//! Authentication error types.

use thiserror::Error;

use strives_core::password::PasswordError;
use strives_db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] strives_core::EmailError),

    /// Invalid phone number.
    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] strives_core::PhoneError),

    /// No account for the given email.
    #[error("user not found")]
    UserNotFound,

    /// Password did not match.
    #[error("incorrect password")]
    IncorrectPassword,

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or could not be hashed.
    #[error("password error: {0}")]
    Password(PasswordError),

    /// Bearer token missing, malformed, expired or for another audience.
    #[error("invalid token")]
    InvalidToken,

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),

    /// Repository/database error.
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
