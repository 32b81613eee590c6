//! Curated product collections.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use strives_core::{CollectionId, ImageId, Slug};

use super::RepositoryError;

/// A collection with its cover image resolved to a URL.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub image_id: Option<ImageId>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Editable fields of a collection.
#[derive(Debug, Clone)]
pub struct CollectionFields<'a> {
    pub name: &'a str,
    pub slug: &'a Slug,
    pub description: Option<&'a str>,
    pub image_id: Option<ImageId>,
}

const SELECT_COLLECTION: &str = "SELECT c.id, c.name, c.slug, c.description, c.image_id,
        i.url AS image_url, c.created_at
     FROM strives.collection c
     LEFT JOIN strives.image i ON i.id = c.image_id";

/// Repository for collections.
pub struct CollectionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CollectionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Collection>, RepositoryError> {
        let rows = sqlx::query_as::<_, Collection>(&format!("{SELECT_COLLECTION} ORDER BY c.name"))
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CollectionId) -> Result<Option<Collection>, RepositoryError> {
        let row = sqlx::query_as::<_, Collection>(&format!("{SELECT_COLLECTION} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cover image doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, fields: &CollectionFields<'_>) -> Result<Collection, RepositoryError> {
        let id = sqlx::query_scalar::<_, CollectionId>(
            "INSERT INTO strives.collection (name, slug, description, image_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(fields.name)
        .bind(fields.slug)
        .bind(fields.description)
        .bind(fields.image_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::constraint_violation(e, "collection"))?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the collection or cover image
    /// doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: CollectionId,
        fields: &CollectionFields<'_>,
    ) -> Result<Collection, RepositoryError> {
        let result = sqlx::query(
            "UPDATE strives.collection SET name = $2, slug = $3, description = $4, image_id = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(fields.name)
        .bind(fields.slug)
        .bind(fields.description)
        .bind(fields.image_id)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::constraint_violation(e, "collection"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the collection doesn't exist.
    pub async fn delete(&self, id: CollectionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM strives.collection WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
