//! `PostgreSQL` access for The Strives.
//!
//! Both servers and the CLI share one database. Every table lives in the
//! `strives` schema:
//!
//! ## Tables
//!
//! - `app_user`, `address`, `otp_code`, `newsletter_subscriber` - storefront accounts
//! - `admin_user` - back-office accounts
//! - `category`, `sub_category`, `tag`, `colour`, `material`, `collection`, `image` - taxonomy and assets
//! - `product`, `product_sub_category`, `product_image` - catalog
//! - `coupon`, `coupon_redemption` - discounts
//! - `customer_order`, `order_item` - orders
//! - `cart_item`, `favourite` - per-user cart and wishlist
//!
//! # Migrations
//!
//! Migrations are stored in `crates/db/migrations/` and embedded in
//! [`MIGRATOR`]. Run them with:
//! ```bash
//! cargo run -p strives-cli -- migrate
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod addresses;
pub mod admin_users;
pub mod attributes;
pub mod carts;
pub mod categories;
pub mod collections;
pub mod coupons;
pub mod favourites;
pub mod images;
pub mod newsletter;
pub mod orders;
pub mod otp;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use admin_users::AdminUserRepository;
pub use attributes::AttributeRepository;
pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use collections::CollectionRepository;
pub use coupons::CouponRepository;
pub use favourites::FavouriteRepository;
pub use images::ImageRepository;
pub use newsletter::NewsletterRepository;
pub use orders::OrderRepository;
pub use otp::OtpRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to [`RepositoryError::Conflict`].
    pub(crate) fn unique_violation(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }

    /// Like [`RepositoryError::unique_violation`], additionally mapping a
    /// dangling reference to [`RepositoryError::NotFound`].
    pub(crate) fn constraint_violation(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_foreign_key_violation()
        {
            return Self::NotFound;
        }
        Self::unique_violation(e, what)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails or was modified after being applied.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Check the database answers a trivial query.
///
/// # Errors
///
/// Returns `sqlx::Error` if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}
