//! Back-office accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use strives_core::{AdminUserId, Email};

use super::RepositoryError;

/// An admin user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub name: String,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AdminWithHash {
    #[sqlx(flatten)]
    admin: AdminUser,
    password_hash: String,
}

/// Repository for admin user operations.
pub struct AdminUserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminUserRepository<'a> {
    /// Create a new admin user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an admin user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AdminUserId) -> Result<Option<AdminUser>, RepositoryError> {
        let admin = sqlx::query_as::<_, AdminUser>(
            "SELECT id, name, email, created_at FROM strives.admin_user WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(admin)
    }

    /// Get an admin together with their password hash, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(AdminUser, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminWithHash>(
            "SELECT id, name, email, created_at, password_hash
             FROM strives.admin_user WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(|r| (r.admin, r.password_hash)))
    }

    /// Create a new admin user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<AdminUser, RepositoryError> {
        sqlx::query_as::<_, AdminUser>(
            "INSERT INTO strives.admin_user (name, email, password_hash)
             VALUES ($1, $2, $3)
             RETURNING id, name, email, created_at",
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "admin email"))
    }
}
