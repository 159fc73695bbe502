//! Kit (catalog product) domain models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use circuit_sphere_core::{KitId, Price, RatingSummary};

/// A kit in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kit {
    /// Store-assigned id.
    pub id: KitId,
    /// Display name.
    pub name: String,
    /// Long description.
    pub description: String,
    /// Category label (matched case-insensitively).
    pub category: String,
    /// Current selling price.
    pub price: Price,
    /// Crossed-out price shown while `on_sale` is set.
    pub original_price: Option<Price>,
    /// Whether the sale styling is active.
    pub on_sale: bool,
    /// Technical specifications, e.g. `{"Voltage": "5V"}`.
    pub specifications: BTreeMap<String, String>,
    /// Wiring diagrams and datasheet images.
    pub spec_images: Vec<String>,
    /// Product gallery, first image is the cover.
    pub image_urls: Vec<String>,
    /// Parts bundled in the kit.
    pub components: Vec<Component>,
    /// Units on hand. Never negative.
    pub stock_quantity: i32,
    /// Cleared instead of deleting the kit.
    pub is_active: bool,
    /// Mean of visible review ratings, one decimal place.
    pub average_rating: f64,
    /// Number of visible reviews.
    pub total_reviews: i64,
    /// When the kit was created.
    pub created_at: DateTime<Utc>,
    /// When the kit was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Kit {
    /// The kit's current review aggregate.
    #[must_use]
    pub const fn rating_summary(&self) -> RatingSummary {
        RatingSummary {
            average_rating: self.average_rating,
            total_reviews: self.total_reviews,
        }
    }
}

/// One part bundled in a kit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Part name, e.g. "ESP32 Development Board".
    pub name: String,
    /// How many of this part the kit contains.
    pub quantity: u32,
    /// Optional note, e.g. "Wi-Fi & Bluetooth enabled".
    #[serde(default)]
    pub description: Option<String>,
}

/// Input for creating a kit.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewKit {
    /// Display name.
    pub name: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Category label.
    #[serde(default = "default_category")]
    pub category: String,
    /// Selling price.
    pub price: Price,
    /// Crossed-out price.
    #[serde(default)]
    pub original_price: Option<Price>,
    /// Start with sale styling on.
    #[serde(default)]
    pub on_sale: bool,
    /// Technical specifications.
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    /// Specification images.
    #[serde(default)]
    pub spec_images: Vec<String>,
    /// Gallery images (already uploaded elsewhere).
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Bundled parts.
    #[serde(default)]
    pub components: Vec<Component>,
    /// Opening stock level.
    pub stock_quantity: i32,
}

fn default_category() -> String {
    "General".to_owned()
}

/// Wrap any value that is present, `null` included, in `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Partial update for a kit. `None` leaves a field untouched.
///
/// `original_price` can also be cleared: an explicit `null` arrives as
/// `Some(None)`, a missing key as `None`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KitPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Price>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_price: Option<Option<Price>>,
    pub on_sale: Option<bool>,
    pub specifications: Option<BTreeMap<String, String>>,
    pub spec_images: Option<Vec<String>>,
    pub image_urls: Option<Vec<String>>,
    pub components: Option<Vec<Component>>,
    /// Absolute stock level (stocktake correction).
    pub stock_quantity: Option<i32>,
    pub is_active: Option<bool>,
}

impl KitPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.original_price.is_none()
            && self.on_sale.is_none()
            && self.specifications.is_none()
            && self.spec_images.is_none()
            && self.image_urls.is_none()
            && self.components.is_none()
            && self.stock_quantity.is_none()
            && self.is_active.is_none()
    }

    /// Apply the patch to a kit in place.
    pub fn apply_to(&self, kit: &mut Kit) {
        if let Some(name) = &self.name {
            kit.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            kit.description.clone_from(description);
        }
        if let Some(category) = &self.category {
            kit.category.clone_from(category);
        }
        if let Some(price) = self.price {
            kit.price = price;
        }
        if let Some(original_price) = self.original_price {
            kit.original_price = original_price;
        }
        if let Some(on_sale) = self.on_sale {
            kit.on_sale = on_sale;
        }
        if let Some(specifications) = &self.specifications {
            kit.specifications.clone_from(specifications);
        }
        if let Some(spec_images) = &self.spec_images {
            kit.spec_images.clone_from(spec_images);
        }
        if let Some(image_urls) = &self.image_urls {
            kit.image_urls.clone_from(image_urls);
        }
        if let Some(components) = &self.components {
            kit.components.clone_from(components);
        }
        if let Some(stock_quantity) = self.stock_quantity {
            kit.stock_quantity = stock_quantity;
        }
        if let Some(is_active) = self.is_active {
            kit.is_active = is_active;
        }
    }
}

/// Filter criteria for listing kits.
#[derive(Debug, Clone)]
pub struct KitFilter {
    /// Case-insensitive substring over name and description.
    pub search: Option<String>,
    /// Case-insensitive exact category match.
    pub category: Option<String>,
    /// Only kits with `is_active` set.
    pub active_only: bool,
    /// Number of results to skip.
    pub skip: i64,
    /// Maximum number of results.
    pub limit: i64,
}

impl Default for KitFilter {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            active_only: true,
            skip: 0,
            limit: 100,
        }
    }
}

impl KitFilter {
    /// Whether a kit passes the filter (pagination aside).
    #[must_use]
    pub fn matches(&self, kit: &Kit) -> bool {
        if self.active_only && !kit.is_active {
            return false;
        }
        if let Some(category) = self.category.as_deref().map(str::trim)
            && !category.is_empty()
            && !kit.category.eq_ignore_ascii_case(category)
        {
            return false;
        }
        if let Some(search) = self.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            let needle = search.to_lowercase();
            return kit.name.to_lowercase().contains(&needle)
                || kit.description.to_lowercase().contains(&needle);
        }
        true
    }
}
