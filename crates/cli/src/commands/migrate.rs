//! Apply the embedded migrations from `crates/db/migrations/`.

use thiserror::Error;

use super::ConnectError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!(
        available = strives_db::MIGRATOR.iter().count(),
        "Running migrations..."
    );
    strives_db::migrate(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
