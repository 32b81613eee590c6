//! One-time password storage.
//!
//! Only the SHA-256 digest of a code is stored. A destination has at most one
//! live code: issuing a new one consumes any earlier ones.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use strives_core::{OtpChannel, OtpId};

use super::RepositoryError;

/// Wrong guesses allowed before a code is burnt.
pub const MAX_ATTEMPTS: i32 = 5;

#[derive(Debug, Clone, sqlx::FromRow)]
struct LiveCode {
    id: OtpId,
    code_hash: String,
    attempts: i32,
}

/// Outcome of checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// The code matched and has now been consumed.
    Verified,
    /// No live code, wrong code, or too many attempts.
    Rejected,
}

/// Repository for OTP codes.
pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new code for `destination`, invalidating earlier ones.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn issue(
        &self,
        destination: &str,
        channel: OtpChannel,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE strives.otp_code SET consumed_at = NOW()
             WHERE destination = $1 AND consumed_at IS NULL",
        )
        .bind(destination)
        .execute(&mut *tx)
        .await?;

        let id = sqlx::query_scalar::<_, OtpId>(
            "INSERT INTO strives.otp_code (destination, channel, code_hash, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(destination)
        .bind(channel)
        .bind(code_hash)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    /// Check `code_hash` against the live code for `destination`.
    ///
    /// A match consumes the code. A miss counts an attempt, and the code is
    /// consumed once [`MAX_ATTEMPTS`] misses have been recorded.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn verify(
        &self,
        destination: &str,
        code_hash: &str,
    ) -> Result<OtpCheck, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let live = sqlx::query_as::<_, LiveCode>(
            "SELECT id, code_hash, attempts FROM strives.otp_code
             WHERE destination = $1 AND consumed_at IS NULL AND expires_at > NOW()
             ORDER BY created_at DESC
             LIMIT 1
             FOR UPDATE",
        )
        .bind(destination)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(live) = live else {
            return Ok(OtpCheck::Rejected);
        };

        let outcome = if live.attempts < MAX_ATTEMPTS && live.code_hash == code_hash {
            sqlx::query("UPDATE strives.otp_code SET consumed_at = NOW() WHERE id = $1")
                .bind(live.id)
                .execute(&mut *tx)
                .await?;
            OtpCheck::Verified
        } else {
            sqlx::query(
                "UPDATE strives.otp_code
                 SET attempts = attempts + 1,
                     consumed_at = CASE WHEN attempts + 1 >= $2 THEN NOW() ELSE consumed_at END
                 WHERE id = $1",
            )
            .bind(live.id)
            .bind(MAX_ATTEMPTS)
            .execute(&mut *tx)
            .await?;
            OtpCheck::Rejected
        };

        tx.commit().await?;
        Ok(outcome)
    }
}
