//! Authentication service.
//!
//! Password registration and login, generated-password resets and bearer
//! tokens.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::TokenKeys;

use sqlx::PgPool;

use strives_core::password::{hash_password, validate_password, verify_password};
use strives_core::{Email, Phone, UserId};
use strives_db::users::{NewUser, PendingPassword, User};
use strives_db::{RepositoryError, UserRepository};

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`/`InvalidPhone` for malformed input.
    /// Returns `AuthError::Password` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let phone = phone
            .filter(|p| !p.trim().is_empty())
            .map(Phone::parse)
            .transpose()?;

        validate_password(password)?;
        let password_hash = hash_password(password)?;

        self.users
            .create(NewUser {
                name: name.trim(),
                email: &email,
                phone: phone.as_ref(),
                password_hash: &password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown email and
    /// `AuthError::IncorrectPassword` for a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_credentials_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Set a password the customer chose.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Password` if validation or hashing fails.
    /// Returns `AuthError::Repository` if the user doesn't exist or the update fails.
    pub async fn set_password(&self, user_id: UserId, password: &str) -> Result<(), AuthError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;
        self.users.set_password(user_id, &password_hash).await?;
        Ok(())
    }

    /// Hash a generated password and hold it until it has been delivered.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Password` if hashing fails.
    /// Returns `AuthError::Repository` if the user doesn't exist or the update fails.
    pub async fn stage_generated_password(
        &self,
        user_id: UserId,
        password: &str,
    ) -> Result<PendingPassword, AuthError> {
        let password_hash = hash_password(password)?;
        Ok(self.users.stage_password(user_id, &password_hash).await?)
    }

    /// Look up a user by email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown email.
    pub async fn find_by_email(&self, email: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        self.users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}
