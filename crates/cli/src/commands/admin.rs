//! Admin user management commands.

use thiserror::Error;

use strives_core::Email;
use strives_core::password::{PasswordError, hash_password, validate_password};
use strives_db::{AdminUserRepository, RepositoryError};

use super::ConnectError;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    Password(#[from] PasswordError),

    #[error("Admin user already exists with email: {0}")]
    UserExists(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Create a back-office account and return its ID.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<i32, AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let name = name.trim();
    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let pool = super::connect().await?;

    tracing::info!("Creating admin user: {}", email);
    let admin = AdminUserRepository::new(&pool)
        .create(name, &email, &password_hash)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        admin.id,
        admin.email
    );
    Ok(admin.id.as_i32())
}
