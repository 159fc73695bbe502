//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod stock;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use circuit_sphere_api::config::get_database_url;
use circuit_sphere_api::db::{self, PgStore};
use circuit_sphere_api::services::{CatalogService, SystemClock};

/// Store calls from the CLI get more room than request handlers.
const CLI_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect to the database named by `API_DATABASE_URL` (or `DATABASE_URL`).
async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = get_database_url("API_DATABASE_URL")?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}

/// Catalog service over a Postgres pool.
fn catalog(pool: PgPool) -> CatalogService {
    let store = Arc::new(PgStore::new(pool, CLI_STORE_TIMEOUT));
    CatalogService::new(store, Arc::new(SystemClock))
}
