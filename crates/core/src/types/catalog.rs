//! Catalog records: products, categories, banners and site settings.
//!
//! Each entity comes in three shapes:
//! - the stored record (`Product`), serialized in camelCase as the admin panel
//!   and storefront expect;
//! - a create body (`ProductInput`) with server-assigned fields left out;
//! - a patch body (`ProductPatch`) where every field is optional and only
//!   the fields present in the request are applied.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::id::{BannerId, CategoryId, ProductId};
use super::money::{amount, amount_opt};

/// Site settings: a free-form JSON object edited from the admin panel.
pub type Settings = serde_json::Map<String, Value>;

/// Shallow-merge `patch` into `settings`: top-level keys in the patch replace
/// existing ones, everything else is left alone.
pub fn merge_settings(settings: &mut Settings, patch: Settings) {
    for (key, value) in patch {
        settings.insert(key, value);
    }
}

/// Errors from validating a create or patch body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("{0} cannot be negative")]
    Negative(&'static str),
}

/// Distinguish "absent" from "explicit null" in patch bodies:
/// missing → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn nullable_amount<'de, D>(deserializer: D) -> Result<Option<Option<Decimal>>, D::Error>
where
    D: Deserializer<'de>,
{
    amount_opt::deserialize(deserializer).map(Some)
}

fn non_empty(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}

fn non_negative_amount(value: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(ValidationError::Negative(field))
    } else {
        Ok(())
    }
}

// =============================================================================
// Products
// =============================================================================

/// A color/size option shown in the product modal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_hex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qty: Option<i32>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(with = "amount")]
    pub price: Decimal,
    #[serde(default, with = "amount_opt", skip_serializing_if = "Option::is_none")]
    pub old_price: Option<Decimal>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: CategoryId,
    #[serde(default)]
    pub stock: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of `POST /api/products`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(with = "amount")]
    pub price: Decimal,
    #[serde(default, with = "amount_opt")]
    pub old_price: Option<Decimal>,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: CategoryId,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: i32,
    #[serde(default)]
    pub description: String,
}

impl ProductInput {
    /// Check required fields and ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an empty name or negative price/stock.
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_empty(&self.name, "name")?;
        non_negative_amount(self.price, "price")?;
        if self.stock < 0 {
            return Err(ValidationError::Negative("stock"));
        }
        Ok(())
    }

    /// Build the stored record with a server-assigned id and creation time.
    #[must_use]
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
            old_price: self.old_price,
            image: self.image,
            images: self.images,
            category: self.category,
            stock: self.stock,
            badge: self.badge.filter(|b| !b.is_empty()),
            active: self.active,
            variants: self.variants,
            rating: self.rating,
            reviews: self.reviews,
            description: self.description,
            created_at: Some(now),
            updated_at: None,
        }
    }
}

/// Body of `PUT /api/products/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    #[serde(default, with = "amount_opt")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable_amount")]
    pub old_price: Option<Option<Decimal>>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub category: Option<CategoryId>,
    pub stock: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub badge: Option<Option<String>>,
    pub active: Option<bool>,
    pub variants: Option<Vec<Variant>>,
    pub rating: Option<f64>,
    pub reviews: Option<i32>,
    pub description: Option<String>,
}

impl ProductPatch {
    /// Check the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for an empty name or negative price/stock.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            non_empty(name, "name")?;
        }
        if let Some(price) = self.price {
            non_negative_amount(price, "price")?;
        }
        if self.stock.is_some_and(|s| s < 0) {
            return Err(ValidationError::Negative("stock"));
        }
        Ok(())
    }

    /// Merge into `product` and stamp `updatedAt`.
    pub fn apply(self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(v) = self.name {
            product.name = v;
        }
        if let Some(v) = self.price {
            product.price = v;
        }
        if let Some(v) = self.old_price {
            product.old_price = v;
        }
        if let Some(v) = self.image {
            product.image = v;
        }
        if let Some(v) = self.images {
            product.images = v;
        }
        if let Some(v) = self.category {
            product.category = v;
        }
        if let Some(v) = self.stock {
            product.stock = v;
        }
        if let Some(v) = self.badge {
            product.badge = v.filter(|b| !b.is_empty());
        }
        if let Some(v) = self.active {
            product.active = v;
        }
        if let Some(v) = self.variants {
            product.variants = v;
        }
        if let Some(v) = self.rating {
            product.rating = v;
        }
        if let Some(v) = self.reviews {
            product.reviews = v;
        }
        if let Some(v) = self.description {
            product.description = v;
        }
        product.updated_at = Some(now);
    }
}

// =============================================================================
// Categories
// =============================================================================

/// A storefront category tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub order: i32,
}

/// Body of `POST /api/categories`. The id defaults to a slug of the name.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    #[serde(default)]
    pub id: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl CategoryInput {
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] when the name (or derived id)
    /// is empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_empty(&self.name, "name")?;
        if let Some(id) = &self.id {
            non_empty(id.as_str(), "id")?;
        } else if CategoryId::slugify(&self.name).as_str().is_empty() {
            return Err(ValidationError::Required("id"));
        }
        Ok(())
    }

    /// Build the stored record at position `order`.
    #[must_use]
    pub fn into_category(self, order: i32) -> Category {
        let id = self
            .id
            .unwrap_or_else(|| CategoryId::slugify(&self.name));
        Category {
            id,
            name: self.name,
            icon: self.icon,
            link: self.link,
            order,
        }
    }
}

/// Body of `PUT /api/categories/{id}`. The id itself is not editable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub icon: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub link: Option<Option<String>>,
    pub order: Option<i32>,
}

impl CategoryPatch {
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] for an empty name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            non_empty(name, "name")?;
        }
        Ok(())
    }

    pub fn apply(self, category: &mut Category) {
        if let Some(v) = self.name {
            category.name = v;
        }
        if let Some(v) = self.icon {
            category.icon = v;
        }
        if let Some(v) = self.link {
            category.link = v;
        }
        if let Some(v) = self.order {
            category.order = v;
        }
    }
}

// =============================================================================
// Banners
// =============================================================================

const fn default_true() -> bool {
    true
}

/// A home page carousel slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub id: BannerId,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Body of `POST /api/banners`.
#[derive(Debug, Clone, Deserialize)]
pub struct BannerInput {
    pub image: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl BannerInput {
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] when no image is given.
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_empty(&self.image, "image")
    }

    #[must_use]
    pub fn into_banner(self, id: BannerId, order: i32) -> Banner {
        Banner {
            id,
            image: self.image,
            title: self.title,
            subtitle: self.subtitle,
            link: self.link,
            order,
            active: self.active,
        }
    }
}

/// Body of `PUT /api/banners/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BannerPatch {
    pub image: Option<String>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub subtitle: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub link: Option<Option<String>>,
    pub order: Option<i32>,
    pub active: Option<bool>,
}

impl BannerPatch {
    /// # Errors
    ///
    /// Returns [`ValidationError::Required`] for an empty image.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(image) = &self.image {
            non_empty(image, "image")?;
        }
        Ok(())
    }

    pub fn apply(self, banner: &mut Banner) {
        if let Some(v) = self.image {
            banner.image = v;
        }
        if let Some(v) = self.title {
            banner.title = v;
        }
        if let Some(v) = self.subtitle {
            banner.subtitle = v;
        }
        if let Some(v) = self.link {
            banner.link = v;
        }
        if let Some(v) = self.order {
            banner.order = v;
        }
        if let Some(v) = self.active {
            banner.active = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product() -> Product {
        serde_json::from_value(json!({
            "id": 3,
            "name": "Camiseta Oversized",
            "price": 129.9,
            "oldPrice": 159.9,
            "image": "images/oversized.png",
            "category": "camisetas",
            "stock": 12,
            "badge": "Oferta",
            "active": true,
            "variants": [{"color": "Preto", "colorHex": "#000000", "size": "M"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_product_reads_admin_json() {
        let p = product();
        assert_eq!(p.id, ProductId::new(3));
        assert_eq!(p.price, d("129.9"));
        assert_eq!(p.old_price, Some(d("159.9")));
        assert_eq!(p.variants[0].color_hex.as_deref(), Some("#000000"));
        assert!(p.created_at.is_none());
    }

    #[test]
    fn test_product_missing_active_is_inactive() {
        let p: Product =
            serde_json::from_value(json!({"id": 1, "name": "X", "price": 1})).unwrap();
        assert!(!p.active);
        assert_eq!(p.stock, 0);
    }

    #[test]
    fn test_product_serializes_camel_case() {
        let value = serde_json::to_value(product()).unwrap();
        assert_eq!(value["oldPrice"], json!(159.9));
        assert_eq!(value["variants"][0]["colorHex"], "#000000");
        assert!(value.get("old_price").is_none());
    }

    #[test]
    fn test_product_input_accepts_brl_price() {
        let input: ProductInput =
            serde_json::from_value(json!({"name": "Boné", "price": "R$ 89,90"})).unwrap();
        assert_eq!(input.price, d("89.90"));
        input.validate().unwrap();
    }

    #[test]
    fn test_product_input_validation() {
        let input: ProductInput =
            serde_json::from_value(json!({"name": "  ", "price": 10})).unwrap();
        assert_eq!(input.validate(), Err(ValidationError::Required("name")));

        let input: ProductInput =
            serde_json::from_value(json!({"name": "A", "price": -1})).unwrap();
        assert_eq!(input.validate(), Err(ValidationError::Negative("price")));
    }

    #[test]
    fn test_into_product_stamps_creation() {
        let now = Utc::now();
        let input: ProductInput =
            serde_json::from_value(json!({"name": "A", "price": 10, "badge": ""})).unwrap();
        let p = input.into_product(ProductId::new(7), now);
        assert_eq!(p.id, ProductId::new(7));
        assert_eq!(p.created_at, Some(now));
        assert_eq!(p.badge, None);
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut p = product();
        let patch: ProductPatch = serde_json::from_value(json!({"stock": 4})).unwrap();
        let now = Utc::now();
        patch.apply(&mut p, now);

        assert_eq!(p.stock, 4);
        assert_eq!(p.name, "Camiseta Oversized");
        assert_eq!(p.old_price, Some(d("159.9")));
        assert_eq!(p.badge.as_deref(), Some("Oferta"));
        assert_eq!(p.updated_at, Some(now));
    }

    #[test]
    fn test_patch_null_clears_optional_fields() {
        let mut p = product();
        let patch: ProductPatch =
            serde_json::from_value(json!({"oldPrice": null, "badge": null})).unwrap();
        patch.apply(&mut p, Utc::now());
        assert_eq!(p.old_price, None);
        assert_eq!(p.badge, None);
    }

    #[test]
    fn test_category_id_defaults_to_slug() {
        let input: CategoryInput =
            serde_json::from_value(json!({"name": "Calças Jeans"})).unwrap();
        input.validate().unwrap();
        let c = input.into_category(4);
        assert_eq!(c.id.as_str(), "cal-as-jeans");
        assert_eq!(c.order, 4);
    }

    #[test]
    fn test_category_explicit_id_kept() {
        let input: CategoryInput =
            serde_json::from_value(json!({"id": "camisetas", "name": "Camisetas"})).unwrap();
        assert_eq!(input.into_category(1).id.as_str(), "camisetas");
    }

    #[test]
    fn test_category_patch() {
        let mut c = Category {
            id: CategoryId::new("bones"),
            name: "Bonés".to_owned(),
            icon: Some("fa-hat".to_owned()),
            link: None,
            order: 2,
        };
        let patch: CategoryPatch =
            serde_json::from_value(json!({"name": "Bonés e Chapéus", "icon": null})).unwrap();
        patch.apply(&mut c);
        assert_eq!(c.name, "Bonés e Chapéus");
        assert_eq!(c.icon, None);
        assert_eq!(c.order, 2);
    }

    #[test]
    fn test_banner_defaults_active() {
        let b: Banner = serde_json::from_value(json!({"id": 1, "image": "a.png"})).unwrap();
        assert!(b.active);

        let input: BannerInput = serde_json::from_value(json!({"image": "b.png"})).unwrap();
        let b = input.into_banner(BannerId::new(2), 3);
        assert!(b.active);
        assert_eq!(b.order, 3);
    }

    #[test]
    fn test_banner_input_requires_image() {
        let input: BannerInput = serde_json::from_value(json!({"image": ""})).unwrap();
        assert_eq!(input.validate(), Err(ValidationError::Required("image")));
    }

    #[test]
    fn test_merge_settings_is_shallow() {
        let mut settings: Settings = serde_json::from_value(json!({
            "siteName": "Imports Company",
            "social": {"instagram": "@imports"}
        }))
        .unwrap();
        let patch: Settings =
            serde_json::from_value(json!({"social": {"whatsapp": "5511"}, "mobileLayout": "2"}))
                .unwrap();
        merge_settings(&mut settings, patch);

        assert_eq!(settings["siteName"], "Imports Company");
        assert_eq!(settings["mobileLayout"], "2");
        assert_eq!(settings["social"], json!({"whatsapp": "5511"}));
    }
}
