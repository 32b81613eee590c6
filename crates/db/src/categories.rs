//! Categories and their sub-categories.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use strives_core::{CategoryId, Slug, SubCategoryId};

use super::RepositoryError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SubCategory {
    pub id: SubCategoryId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: Slug,
    pub created_at: DateTime<Utc>,
}

/// Repository for categories and sub-categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, created_at FROM strives.category ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description, created_at FROM strives.category WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        name: &str,
        slug: &Slug,
        description: Option<&str>,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO strives.category (name, slug, description)
             VALUES ($1, $2, $3)
             RETURNING id, name, slug, description, created_at",
        )
        .bind(name)
        .bind(slug)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "category"))
    }

    /// Rename a category or change its description.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: CategoryId,
        name: &str,
        slug: &Slug,
        description: Option<&str>,
    ) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            "UPDATE strives.category SET name = $2, slug = $3, description = $4
             WHERE id = $1
             RETURNING id, name, slug, description, created_at",
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(description)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "category"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a category and its sub-categories. Products keep existing with
    /// no category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM strives.category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List sub-categories, optionally only those of one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_sub_categories(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<SubCategory>, RepositoryError> {
        let rows = sqlx::query_as::<_, SubCategory>(
            "SELECT id, category_id, name, slug, created_at FROM strives.sub_category
             WHERE $1::INTEGER IS NULL OR category_id = $1
             ORDER BY name",
        )
        .bind(category)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_sub_category(
        &self,
        id: SubCategoryId,
    ) -> Result<Option<SubCategory>, RepositoryError> {
        let row = sqlx::query_as::<_, SubCategory>(
            "SELECT id, category_id, name, slug, created_at FROM strives.sub_category WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Create a sub-category under `category_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken in that category.
    pub async fn create_sub_category(
        &self,
        category_id: CategoryId,
        name: &str,
        slug: &Slug,
    ) -> Result<SubCategory, RepositoryError> {
        sqlx::query_as::<_, SubCategory>(
            "INSERT INTO strives.sub_category (category_id, name, slug)
             VALUES ($1, $2, $3)
             RETURNING id, category_id, name, slug, created_at",
        )
        .bind(category_id)
        .bind(name)
        .bind(slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::constraint_violation(e, "sub-category"))
    }

    /// Rename and/or move a sub-category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the sub-category or the target
    /// category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update_sub_category(
        &self,
        id: SubCategoryId,
        category_id: CategoryId,
        name: &str,
        slug: &Slug,
    ) -> Result<SubCategory, RepositoryError> {
        sqlx::query_as::<_, SubCategory>(
            "UPDATE strives.sub_category SET category_id = $2, name = $3, slug = $4
             WHERE id = $1
             RETURNING id, category_id, name, slug, created_at",
        )
        .bind(id)
        .bind(category_id)
        .bind(name)
        .bind(slug)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::constraint_violation(e, "sub-category"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the sub-category doesn't exist.
    pub async fn delete_sub_category(&self, id: SubCategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM strives.sub_category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
