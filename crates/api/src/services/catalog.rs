//! Catalog service: kit CRUD, sale and spec updates, stock adjustment.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::instrument;

use circuit_sphere_core::KitId;

use super::clock::Clock;
use super::error::{Result, ServiceError, ValidationError};
use super::validate;
use crate::db::RepositoryError;
use crate::models::{Component, Kit, KitFilter, KitPatch, NewKit};
use crate::store::CatalogStore;

/// Largest page a kit or order listing returns.
pub const MAX_PAGE_SIZE: i64 = 1000;

const NAME_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 1000;
const CATEGORY_MAX: usize = 100;

/// Kit management on top of a [`CatalogStore`].
#[derive(Clone)]
pub struct CatalogService {
    kits: Arc<dyn CatalogStore>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    /// Create a new catalog service.
    #[must_use]
    pub fn new(kits: Arc<dyn CatalogStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kits, clock }
    }

    /// Add a kit to the catalog.
    ///
    /// The kit starts active with no reviews.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` if a field is out of range.
    #[instrument(skip(self, kit), fields(name = %kit.name))]
    pub async fn create_kit(&self, kit: NewKit) -> Result<Kit> {
        let kit = validate_new_kit(kit)?;
        let kit = self.kits.insert_kit(kit, self.clock.now()).await?;

        tracing::info!(kit_id = %kit.id, stock = kit.stock_quantity, "Created kit");
        Ok(kit)
    }

    /// Fetch a kit by id, active or not.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the kit does not exist.
    #[instrument(skip(self), fields(kit_id = %id))]
    pub async fn get_kit(&self, id: KitId) -> Result<Kit> {
        self.kits
            .find_kit(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("kit", id))
    }

    /// List kits, newest first. The page size is capped at [`MAX_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Database` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_kits(&self, mut filter: KitFilter) -> Result<Vec<Kit>> {
        filter.skip = filter.skip.max(0);
        filter.limit = filter.limit.clamp(0, MAX_PAGE_SIZE);
        Ok(self.kits.list_kits(&filter).await?)
    }

    /// Apply a partial update. An empty patch returns the kit unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the kit does not exist.
    /// Returns `ServiceError::Validation` if a patched field is out of range.
    #[instrument(skip(self, patch), fields(kit_id = %id))]
    pub async fn update_kit(&self, id: KitId, patch: KitPatch) -> Result<Kit> {
        if patch.is_empty() {
            return self.get_kit(id).await;
        }
        let patch = validate_patch(patch)?;
        self.apply(id, &patch).await
    }

    /// Switch the sale styling on or off.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the kit does not exist.
    #[instrument(skip(self), fields(kit_id = %id))]
    pub async fn toggle_sale(&self, id: KitId, on_sale: bool) -> Result<Kit> {
        let patch = KitPatch {
            on_sale: Some(on_sale),
            ..KitPatch::default()
        };
        self.apply(id, &patch).await
    }

    /// Replace the technical specifications and their images.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the kit does not exist.
    #[instrument(skip(self, specifications, spec_images), fields(kit_id = %id))]
    pub async fn update_specs(
        &self,
        id: KitId,
        specifications: BTreeMap<String, String>,
        spec_images: Vec<String>,
    ) -> Result<Kit> {
        let patch = KitPatch {
            specifications: Some(specifications),
            spec_images: Some(spec_images),
            ..KitPatch::default()
        };
        self.apply(id, &patch).await
    }

    /// Soft-delete a kit. It stays readable by id but drops out of the
    /// default listing and can no longer be ordered.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the kit does not exist.
    #[instrument(skip(self), fields(kit_id = %id))]
    pub async fn deactivate_kit(&self, id: KitId) -> Result<Kit> {
        let patch = KitPatch {
            is_active: Some(false),
            ..KitPatch::default()
        };
        let kit = self.apply(id, &patch).await?;
        tracing::info!(kit_id = %id, "Deactivated kit");
        Ok(kit)
    }

    /// Add `delta` units to a kit's stock (negative to remove).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the kit does not exist.
    /// Returns `ServiceError::InsufficientStock` if the stock would go
    /// negative. The stock is left unchanged in that case.
    #[instrument(skip(self), fields(kit_id = %id, delta = %delta))]
    pub async fn adjust_stock(&self, id: KitId, delta: i32) -> Result<Kit> {
        match self.kits.adjust_stock(id, delta, self.clock.now()).await {
            Ok(kit) => Ok(kit),
            Err(RepositoryError::NotFound) => Err(ServiceError::not_found("kit", id)),
            Err(RepositoryError::InsufficientStock { available, delta }) => {
                let title = self
                    .kits
                    .find_kit(id)
                    .await?
                    .map(|k| k.name)
                    .unwrap_or_default();
                Err(ServiceError::InsufficientStock {
                    kit_id: id,
                    title,
                    available,
                    requested: delta.unsigned_abs(),
                })
            }
            Err(RepositoryError::StockOverflow { .. }) => Err(validate::invalid(
                "delta",
                format!("would take the stock above {}", i32::MAX),
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn apply(&self, id: KitId, patch: &KitPatch) -> Result<Kit> {
        self.kits
            .update_kit(id, patch, self.clock.now())
            .await?
            .ok_or_else(|| ServiceError::not_found("kit", id))
    }
}

fn validate_components(components: &[Component]) -> std::result::Result<(), ValidationError> {
    for (i, component) in components.iter().enumerate() {
        if component.name.trim().is_empty() {
            return Err(validate::invalid(
                &format!("components[{i}].name"),
                "must not be empty",
            ));
        }
        if component.quantity == 0 {
            return Err(validate::invalid(
                &format!("components[{i}].quantity"),
                "must be at least 1",
            ));
        }
    }
    Ok(())
}

fn validate_new_kit(mut kit: NewKit) -> std::result::Result<NewKit, ValidationError> {
    kit.name = validate::text("name", &kit.name, 1, NAME_MAX)?;
    kit.description = validate::text("description", &kit.description, 0, DESCRIPTION_MAX)?;
    kit.category = validate::text("category", &kit.category, 1, CATEGORY_MAX)?;
    validate::stock("stock_quantity", kit.stock_quantity)?;
    validate_components(&kit.components)?;
    Ok(kit)
}

fn validate_patch(mut patch: KitPatch) -> std::result::Result<KitPatch, ValidationError> {
    patch.name = patch
        .name
        .as_deref()
        .map(|v| validate::text("name", v, 1, NAME_MAX))
        .transpose()?;
    patch.description = patch
        .description
        .as_deref()
        .map(|v| validate::text("description", v, 0, DESCRIPTION_MAX))
        .transpose()?;
    patch.category = patch
        .category
        .as_deref()
        .map(|v| validate::text("category", v, 1, CATEGORY_MAX))
        .transpose()?;
    if let Some(stock) = patch.stock_quantity {
        validate::stock("stock_quantity", stock)?;
    }
    if let Some(components) = &patch.components {
        validate_components(components)?;
    }
    Ok(patch)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use circuit_sphere_core::Price;
    use rust_decimal::Decimal;

    use super::*;
    use crate::services::clock::ManualClock;
    use crate::store::InMemoryStore;

    fn service() -> CatalogService {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
        CatalogService::new(Arc::new(InMemoryStore::new()), Arc::new(clock))
    }

    fn new_kit(stock: i32) -> NewKit {
        NewKit {
            name: "  Weather Station Kit ".to_owned(),
            description: "BME280 based".to_owned(),
            category: "IoT".to_owned(),
            price: Price::new(Decimal::new(3500, 2)).unwrap(),
            original_price: None,
            on_sale: false,
            specifications: BTreeMap::new(),
            spec_images: Vec::new(),
            image_urls: Vec::new(),
            components: vec![Component {
                name: "BME280".to_owned(),
                quantity: 1,
                description: None,
            }],
            stock_quantity: stock,
        }
    }

    #[tokio::test]
    async fn test_create_kit_trims_and_initialises() {
        let catalog = service();
        let kit = catalog.create_kit(new_kit(4)).await.unwrap();

        assert_eq!(kit.name, "Weather Station Kit");
        assert!(kit.is_active);
        assert_eq!(kit.total_reviews, 0);
        assert!(kit.average_rating.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_create_kit_rejects_negative_stock() {
        let catalog = service();
        let err = catalog.create_kit(new_kit(-1)).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InvalidInput { ref field, .. })
                if field == "stock_quantity"
        ));
    }

    #[tokio::test]
    async fn test_create_kit_rejects_zero_quantity_component() {
        let catalog = service();
        let mut kit = new_kit(1);
        kit.components[0].quantity = 0;
        let err = catalog.create_kit(kit).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InvalidInput { ref field, .. })
                if field == "components[0].quantity"
        ));
    }

    #[tokio::test]
    async fn test_adjust_stock_reports_available_and_requested() {
        let catalog = service();
        let kit = catalog.create_kit(new_kit(3)).await.unwrap();

        let err = catalog.adjust_stock(kit.id, -4).await.unwrap_err();
        match err {
            ServiceError::InsufficientStock {
                title,
                available,
                requested,
                ..
            } => {
                assert_eq!(title, "Weather Station Kit");
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(catalog.get_kit(kit.id).await.unwrap().stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_adjust_stock_overflow_names_delta() {
        let catalog = service();
        let kit = catalog.create_kit(new_kit(3)).await.unwrap();

        let err = catalog.adjust_stock(kit.id, i32::MAX).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::InvalidInput { ref field, .. }) if field == "delta"
        ));
        assert_eq!(catalog.get_kit(kit.id).await.unwrap().stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_deactivate_hides_from_default_listing() {
        let catalog = service();
        let kit = catalog.create_kit(new_kit(1)).await.unwrap();
        catalog.deactivate_kit(kit.id).await.unwrap();

        assert!(catalog.list_kits(KitFilter::default()).await.unwrap().is_empty());
        let all = KitFilter {
            active_only: false,
            ..KitFilter::default()
        };
        assert_eq!(catalog.list_kits(all).await.unwrap().len(), 1);
        assert!(!catalog.get_kit(kit.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_empty_patch_returns_kit_unchanged() {
        let catalog = service();
        let kit = catalog.create_kit(new_kit(1)).await.unwrap();
        let same = catalog.update_kit(kit.id, KitPatch::default()).await.unwrap();
        assert_eq!(same, kit);
    }

    #[tokio::test]
    async fn test_toggle_sale_unknown_kit() {
        let catalog = service();
        let err = catalog.toggle_sale(KitId::new(7), true).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { entity: "kit", .. }));
    }
}
