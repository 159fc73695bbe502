//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! kits:
//!   - name: Smart Home Starter Kit
//!     category: IoT
//!     price: "49.99"
//!     stock_quantity: 20
//!     components:
//!       - name: ESP32 Development Board
//!         quantity: 1
//! ```
//!
//! Every kit goes through the same validation as `POST /api/v1/kits`.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use circuit_sphere_api::models::NewKit;
use circuit_sphere_api::services::CatalogService;

/// Top-level layout of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub kits: Vec<NewKit>,
}

/// Parse a seed file's contents.
///
/// # Errors
///
/// Returns the YAML error if the document does not match [`SeedFile`].
pub fn parse(content: &str) -> Result<SeedFile, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Insert kits through the catalog service, stopping at the first failure.
///
/// Returns the number of kits created.
///
/// # Errors
///
/// Returns the service error for the first kit that fails validation or
/// cannot be stored, naming the kit.
pub async fn insert_all(
    catalog: &CatalogService,
    kits: Vec<NewKit>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut created = 0;
    for kit in kits {
        let name = kit.name.clone();
        let kit = catalog
            .create_kit(kit)
            .await
            .map_err(|e| format!("kit {name:?}: {e}"))?;
        info!(kit_id = %kit.id, name = %kit.name, "Seeded kit");
        created += 1;
    }
    Ok(created)
}

/// Seed kits from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML file
/// * `clear_existing` - If true, delete all kits and reviews first
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a database
/// operation fails.
pub async fn kits(file_path: &str, clear_existing: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading kits from file");

    // Parse before connecting so a bad file never touches the database
    let content = tokio::fs::read_to_string(path).await?;
    let seed = parse(&content)?;
    info!(kits = seed.kits.len(), "Parsed seed file");

    let pool = super::connect().await?;

    if clear_existing {
        warn!("Clearing existing kits and reviews");
        sqlx::query("TRUNCATE shop.review, shop.kit RESTART IDENTITY")
            .execute(&pool)
            .await?;
    }

    let catalog = super::catalog(pool.clone());
    let created = insert_all(&catalog, seed.kits).await?;

    info!(created, "Seeding complete!");
    pool.close().await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use circuit_sphere_api::models::KitFilter;
    use circuit_sphere_api::services::SystemClock;
    use circuit_sphere_api::store::InMemoryStore;

    use super::*;

    const SAMPLE: &str = include_str!("../../seed/kits.yaml");

    #[test]
    fn test_sample_file_parses() {
        let seed = parse(SAMPLE).unwrap();
        assert!(!seed.kits.is_empty());
        assert!(seed.kits.iter().all(|k| k.stock_quantity >= 0));
    }

    #[test]
    fn test_parse_rejects_non_positive_price() {
        let yaml = "kits:\n  - name: Broken\n    price: \"0\"\n    stock_quantity: 1\n";
        assert!(parse(yaml).is_err());
    }

    #[tokio::test]
    async fn test_insert_all_into_catalog() {
        let catalog = CatalogService::new(Arc::new(InMemoryStore::new()), Arc::new(SystemClock));
        let seed = parse(SAMPLE).unwrap();
        let expected = seed.kits.len();

        let created = insert_all(&catalog, seed.kits).await.unwrap();
        assert_eq!(created, expected);

        let listed = catalog.list_kits(KitFilter::default()).await.unwrap();
        assert_eq!(listed.len(), expected);
    }
}
