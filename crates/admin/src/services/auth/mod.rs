//! Admin password login and bearer tokens.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::TokenKeys;

use sqlx::PgPool;

use strives_core::Email;
use strives_core::password::verify_password;
use strives_db::AdminUserRepository;
use strives_db::admin_users::AdminUser;

/// Authentication service for back-office accounts.
pub struct AuthService<'a> {
    admins: AdminUserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            admins: AdminUserRepository::new(pool),
        }
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` for an unknown email and
    /// `AuthError::IncorrectPassword` for a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<AdminUser, AuthError> {
        let email = Email::parse(email)?;
        let (admin, password_hash) = self
            .admins
            .get_credentials_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(password, &password_hash)?;
        Ok(admin)
    }
}
