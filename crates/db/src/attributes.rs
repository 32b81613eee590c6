//! Flat product attributes: tags, colours and materials.

use serde::Serialize;
use sqlx::PgPool;

use strives_core::{ColourId, MaterialId, Slug, TagId};

use super::RepositoryError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: TagId,
    pub name: Slug,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Colour {
    pub id: ColourId,
    pub name: String,
    pub hex: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
}

/// Repository for tags, colours and materials.
pub struct AttributeRepository<'a> {
    pool: &'a PgPool,
}

async fn delete_by_id(pool: &PgPool, sql: &str, id: i32) -> Result<(), RepositoryError> {
    let result = sqlx::query(sql).bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

impl<'a> AttributeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List tags alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, RepositoryError> {
        let rows = sqlx::query_as::<_, Tag>("SELECT id, name FROM strives.tag ORDER BY name")
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the tag exists.
    pub async fn create_tag(&self, name: &Slug) -> Result<Tag, RepositoryError> {
        sqlx::query_as::<_, Tag>("INSERT INTO strives.tag (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::unique_violation(e, "tag"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the tag doesn't exist.
    pub async fn delete_tag(&self, id: TagId) -> Result<(), RepositoryError> {
        delete_by_id(self.pool, "DELETE FROM strives.tag WHERE id = $1", id.as_i32()).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_colours(&self) -> Result<Vec<Colour>, RepositoryError> {
        let rows =
            sqlx::query_as::<_, Colour>("SELECT id, name, hex FROM strives.colour ORDER BY name")
                .fetch_all(self.pool)
                .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the colour exists.
    pub async fn create_colour(
        &self,
        name: &str,
        hex: Option<&str>,
    ) -> Result<Colour, RepositoryError> {
        sqlx::query_as::<_, Colour>(
            "INSERT INTO strives.colour (name, hex) VALUES ($1, $2) RETURNING id, name, hex",
        )
        .bind(name)
        .bind(hex)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "colour"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the colour doesn't exist.
    pub async fn delete_colour(&self, id: ColourId) -> Result<(), RepositoryError> {
        delete_by_id(self.pool, "DELETE FROM strives.colour WHERE id = $1", id.as_i32()).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_materials(&self) -> Result<Vec<Material>, RepositoryError> {
        let rows =
            sqlx::query_as::<_, Material>("SELECT id, name FROM strives.material ORDER BY name")
                .fetch_all(self.pool)
                .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the material exists.
    pub async fn create_material(&self, name: &str) -> Result<Material, RepositoryError> {
        sqlx::query_as::<_, Material>(
            "INSERT INTO strives.material (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "material"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the material doesn't exist.
    pub async fn delete_material(&self, id: MaterialId) -> Result<(), RepositoryError> {
        delete_by_id(self.pool, "DELETE FROM strives.material WHERE id = $1", id.as_i32()).await
    }
}
