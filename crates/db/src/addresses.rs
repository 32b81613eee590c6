//! Shipping addresses. Each user has at most one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use strives_core::{AddressId, Phone, UserId};

use super::RepositoryError;

/// A stored shipping address.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub fields: AddressFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The user-editable part of an address. Also snapshotted onto orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AddressFields {
    pub name: String,
    pub phone: Phone,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub landmark: Option<String>,
}

const ADDRESS_COLUMNS: &str = "id, user_id, name, phone, line1, line2, city, state, pincode, landmark, created_at, updated_at";

/// Repository for address operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the address of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(&self, user_id: UserId) -> Result<Option<Address>, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM strives.address WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(address)
    }

    /// Create the address of a user.
    ///
    /// The insert and the link to the user are one statement, so there is
    /// never an address without an owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has an address.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        user_id: UserId,
        fields: &AddressFields,
    ) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO strives.address
                 (user_id, name, phone, line1, line2, city, state, pincode, landmark)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&fields.name)
        .bind(&fields.phone)
        .bind(&fields.line1)
        .bind(&fields.line2)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.pincode)
        .bind(&fields.landmark)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "address"))
    }

    /// Replace the address of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user has no address.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        user_id: UserId,
        fields: &AddressFields,
    ) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, Address>(&format!(
            "UPDATE strives.address
             SET name = $2, phone = $3, line1 = $4, line2 = $5, city = $6,
                 state = $7, pincode = $8, landmark = $9, updated_at = NOW()
             WHERE user_id = $1
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&fields.name)
        .bind(&fields.phone)
        .bind(&fields.line1)
        .bind(&fields.line2)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.pincode)
        .bind(&fields.landmark)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}
