//! Database migration command.
//!
//! Applies the migrations in `crates/api/migrations/` to the database named
//! by `API_DATABASE_URL` (falls back to `DATABASE_URL`).

use circuit_sphere_api::MIGRATOR;

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    pool.close().await;
    Ok(())
}
