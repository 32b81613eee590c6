//! Coupons and their redemptions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use strives_core::coupon::{CouponRules, Discount};
use strives_core::{CouponId, DiscountKind, Slug, UserId};

use super::RepositoryError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: CouponId,
    pub code: Slug,
    pub description: Option<String>,
    pub discount_kind: DiscountKind,
    pub discount_value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_amount: Decimal,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub per_user_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// The parts of the coupon eligibility depends on.
    #[must_use]
    pub fn rules(&self) -> CouponRules {
        CouponRules {
            discount: Discount::from_parts(self.discount_kind, self.discount_value, self.max_discount),
            min_amount: self.min_amount,
            max_uses: self.max_uses,
            times_used: self.times_used,
            per_user_limit: self.per_user_limit,
            expires_at: self.expires_at,
        }
    }
}

/// Editable fields of a coupon.
#[derive(Debug, Clone)]
pub struct CouponFields {
    pub code: Slug,
    pub description: Option<String>,
    pub discount_kind: DiscountKind,
    pub discount_value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_amount: Decimal,
    pub max_uses: Option<i32>,
    pub per_user_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

const COUPON_COLUMNS: &str = "id, code, description, discount_kind, discount_value, max_discount,
    min_amount, max_uses, times_used, per_user_limit, expires_at, created_at";

/// Number of times `user_id` has redeemed `coupon_id`.
pub(crate) async fn redemptions_by_user(
    conn: &mut PgConnection,
    coupon_id: CouponId,
    user_id: UserId,
) -> Result<i64, RepositoryError> {
    let n = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM strives.coupon_redemption WHERE coupon_id = $1 AND user_id = $2",
    )
    .bind(coupon_id)
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(n)
}

/// Lock and load a coupon by code inside an open transaction.
pub(crate) async fn lock_by_code(
    conn: &mut PgConnection,
    code: &Slug,
) -> Result<Option<Coupon>, RepositoryError> {
    let coupon = sqlx::query_as::<_, Coupon>(&format!(
        "SELECT {COUPON_COLUMNS} FROM strives.coupon WHERE code = $1 FOR UPDATE"
    ))
    .bind(code)
    .fetch_optional(conn)
    .await?;
    Ok(coupon)
}

/// Repository for coupons.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM strives.coupon ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &Slug) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM strives.coupon WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Number of times `user_id` has redeemed `coupon_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn redemptions_by_user(
        &self,
        coupon_id: CouponId,
        user_id: UserId,
    ) -> Result<i64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        redemptions_by_user(&mut conn, coupon_id, user_id).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, fields: &CouponFields) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(&format!(
            "INSERT INTO strives.coupon
                 (code, description, discount_kind, discount_value, max_discount, min_amount,
                  max_uses, per_user_limit, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(&fields.code)
        .bind(&fields.description)
        .bind(fields.discount_kind)
        .bind(fields.discount_value)
        .bind(fields.max_discount)
        .bind(fields.min_amount)
        .bind(fields.max_uses)
        .bind(fields.per_user_limit)
        .bind(fields.expires_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "coupon"))
    }

    /// Replace a coupon's definition. Usage counters are kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon doesn't exist.
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn update(
        &self,
        id: CouponId,
        fields: &CouponFields,
    ) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(&format!(
            "UPDATE strives.coupon
             SET code = $2, description = $3, discount_kind = $4, discount_value = $5,
                 max_discount = $6, min_amount = $7, max_uses = $8, per_user_limit = $9,
                 expires_at = $10
             WHERE id = $1
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(id)
        .bind(&fields.code)
        .bind(&fields.description)
        .bind(fields.discount_kind)
        .bind(fields.discount_value)
        .bind(fields.max_discount)
        .bind(fields.min_amount)
        .bind(fields.max_uses)
        .bind(fields.per_user_limit)
        .bind(fields.expires_at)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "coupon"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon doesn't exist.
    pub async fn delete(&self, id: CouponId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM strives.coupon WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
