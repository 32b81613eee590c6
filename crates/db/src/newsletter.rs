//! Newsletter subscriptions.

use sqlx::PgPool;

use strives_core::{Email, SubscriberId};

use super::RepositoryError;

/// Repository for newsletter subscribers.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the address is already subscribed.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn subscribe(&self, email: &Email) -> Result<SubscriberId, RepositoryError> {
        sqlx::query_scalar::<_, SubscriberId>(
            "INSERT INTO strives.newsletter_subscriber (email) VALUES ($1) RETURNING id",
        )
        .bind(email)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "subscriber"))
    }
}
