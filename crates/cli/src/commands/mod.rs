//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// Connection string from `DATABASE_URL`, falling back to `ADMIN_DATABASE_URL`.
fn database_url() -> Option<SecretString> {
    std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("ADMIN_DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Missing environment variable: DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

async fn connect() -> Result<PgPool, ConnectError> {
    let url = database_url().ok_or(ConnectError::MissingDatabaseUrl)?;
    tracing::info!("Connecting to database...");
    Ok(strives_db::create_pool(&url).await?)
}
