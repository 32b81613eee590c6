//! Per-user wishlists.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use strives_core::wishlist::Wishlist;
use strives_core::{ProductId, UserId};

use super::RepositoryError;
use super::carts::lock_owner;
use super::products::{ProductSummary, SUMMARY_COLUMNS};

/// A favourite joined with the product it refers to.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FavouriteView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub product: ProductSummary,
    pub added_at: DateTime<Utc>,
}

/// Repository for favourites.
pub struct FavouriteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FavouriteRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's favourites, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<FavouriteView>, RepositoryError> {
        let rows = sqlx::query_as::<_, FavouriteView>(&format!(
            "SELECT {SUMMARY_COLUMNS}, f.added_at
             FROM strives.favourite f
             JOIN strives.product p ON p.id = f.product_id
             WHERE f.user_id = $1
             ORDER BY f.added_at, f.product_id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|mut fav| {
                fav.product = fav.product.with_discount();
                fav
            })
            .collect())
    }

    /// Add a product. Returns `false` if it was already a favourite.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user or product doesn't exist.
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_owner(&mut tx, user_id).await?;

        let current = sqlx::query_scalar::<_, ProductId>(
            "SELECT product_id FROM strives.favourite WHERE user_id = $1 ORDER BY added_at",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;

        let mut wishlist = Wishlist::from_products(current);
        let inserted = wishlist.add(product_id);
        if inserted {
            sqlx::query("INSERT INTO strives.favourite (user_id, product_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(product_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::constraint_violation(e, "favourite"))?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Remove a product. Returns `false` if it was not a favourite.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM strives.favourite WHERE user_id = $1 AND product_id = $2")
                .bind(user_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every favourite.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM strives.favourite WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
