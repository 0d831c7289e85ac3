//! Database migration command.
//!
//! Applies the migrations embedded from `crates/api/migrations/`. The API
//! applies the same set on startup when `CMS_RUN_MIGRATIONS=true`.

use super::{CommandError, connect};

/// Apply pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    cms_api::db::MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
