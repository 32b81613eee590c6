//! Uploaded image metadata. The bytes live in object storage.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use strives_core::{ImageId, ProductId};

use super::RepositoryError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Image {
    pub id: ImageId,
    pub name: String,
    pub object_key: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

/// Metadata of an object that has just been stored.
#[derive(Debug, Clone)]
pub struct NewImage<'a> {
    pub name: &'a str,
    pub object_key: &'a str,
    pub url: &'a str,
    pub content_type: &'a str,
    pub size_bytes: i64,
}

const IMAGE_COLUMNS: &str = "id, name, object_key, url, content_type, size_bytes, created_at";

/// Repository for image metadata.
pub struct ImageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ImageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List images, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Image>, RepositoryError> {
        let rows = sqlx::query_as::<_, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM strives.image ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ImageId) -> Result<Option<Image>, RepositoryError> {
        let row = sqlx::query_as::<_, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM strives.image WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Record a stored object.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the object key is already recorded.
    pub async fn create(&self, new: &NewImage<'_>) -> Result<Image, RepositoryError> {
        sqlx::query_as::<_, Image>(&format!(
            "INSERT INTO strives.image (name, object_key, url, content_type, size_bytes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(new.name)
        .bind(new.object_key)
        .bind(new.url)
        .bind(new.content_type)
        .bind(new.size_bytes)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "image"))
    }

    /// Record a stored object and attach it to the end of a product's gallery.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the object key is already recorded.
    pub async fn create_for_product(
        &self,
        product_id: ProductId,
        new: &NewImage<'_>,
    ) -> Result<Image, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let image = sqlx::query_as::<_, Image>(&format!(
            "INSERT INTO strives.image (name, object_key, url, content_type, size_bytes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(new.name)
        .bind(new.object_key)
        .bind(new.url)
        .bind(new.content_type)
        .bind(new.size_bytes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "image"))?;

        sqlx::query(
            "INSERT INTO strives.product_image (product_id, image_id, position)
             VALUES ($1, $2, COALESCE(
                 (SELECT MAX(position) + 1 FROM strives.product_image WHERE product_id = $1), 0))",
        )
        .bind(product_id)
        .bind(image.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::constraint_violation(e, "product image"))?;

        tx.commit().await?;
        Ok(image)
    }

    /// Delete an image row. Product galleries drop it automatically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image doesn't exist.
    pub async fn delete(&self, id: ImageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM strives.image WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
