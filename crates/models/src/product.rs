use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::resource::{merge, trimmed, MediaRef, Reference, Resource, ResourceKind, ResourcePatch};
use crate::schema::{AttributeSpec, IndexKind, IndexSpec, SortOrder, CREATED_AT_DESC};
use crate::validation::{validate_name, validate_non_negative, validate_reference};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Food,
    Grocery,
    Household,
    PersonalCare,
    Other,
}

impl ProductType {
    pub const ELEMENTS: &'static [&'static str] = &["food", "grocery", "household", "personal_care", "other"];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    G,
    Kg,
    Ml,
    L,
    Pcs,
}

impl WeightUnit {
    pub const ELEMENTS: &'static [&'static str] = &["g", "kg", "ml", "l", "pcs"];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
}

/// A sellable size/pack of a product, e.g. 500 g vs 1 kg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    pub mrp_price: f64,
    pub selling_price: f64,
    #[serde(default)]
    pub stock: u32,
}

impl Variation {
    fn validate(&self) -> Result<(), ModelError> {
        validate_non_negative("variation mrpPrice", self.mrp_price)?;
        validate_non_negative("variation sellingPrice", self.selling_price)?;
        if let Some(w) = self.weight {
            validate_non_negative("variation weight", w)?;
        }
        Ok(())
    }
}

/// The store has no nested-object attribute type, so each variation is kept
/// as one JSON-encoded string in a string array.
mod json_strings {
    use serde::de::{DeserializeOwned, Error as _};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    fn encode<T: Serialize, E: serde::ser::Error>(items: &[T]) -> Result<Vec<String>, E> {
        items.iter().map(|i| serde_json::to_string(i).map_err(E::custom)).collect()
    }

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer, T: Serialize>(items: &Vec<T>, s: S) -> Result<S::Ok, S::Error> {
        encode::<T, S::Error>(items)?.serialize(s)
    }

    pub fn serialize_opt<S: Serializer, T: Serialize>(items: &Option<Vec<T>>, s: S) -> Result<S::Ok, S::Error> {
        match items {
            Some(items) => encode::<T, S::Error>(items)?.serialize(s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>, T: DeserializeOwned>(d: D) -> Result<Vec<T>, D::Error> {
        let raw = Option::<Vec<String>>::deserialize(d)?.unwrap_or_default();
        raw.iter().map(|s| serde_json::from_str(s).map_err(D::Error::custom)).collect()
    }
}

fn default_min_order() -> u32 { 1 }
fn default_country() -> String { "India".into() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub product_type: ProductType,
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<String>,
    pub mrp_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
    pub selling_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    #[serde(default)]
    pub stock: u32,
    #[serde(default = "default_min_order")]
    pub min_order_quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_order_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsn_code: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_food_item: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fssai_license: Option<String>,
    #[serde(default = "default_country")]
    pub country_of_origin: String,
    /// Stored file ids, first one is the primary image.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default, with = "json_strings")]
    pub variations: Vec<Variation>,
    #[serde(default)]
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        category_id: impl Into<String>,
        product_type: ProductType,
        mrp_price: f64,
        selling_price: f64,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            description: None,
            product_type,
            category_id: category_id.into(),
            brand_id: None,
            mrp_price,
            purchase_price: None,
            selling_price,
            discount: None,
            weight: None,
            weight_unit: WeightUnit::default(),
            stock: 0,
            min_order_quantity: default_min_order(),
            max_order_quantity: None,
            barcode: None,
            hsn_code: None,
            tags: Vec::new(),
            is_food_item: product_type == ProductType::Food,
            fssai_license: None,
            country_of_origin: default_country(),
            images: Vec::new(),
            image_urls: Vec::new(),
            variations: Vec::new(),
            status: ProductStatus::Active,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn with_brand(mut self, brand_id: impl Into<String>) -> Self {
        self.brand_id = Some(brand_id.into());
        self
    }

    pub fn with_fssai_license(mut self, license: impl Into<String>) -> Self {
        self.fssai_license = Some(license.into());
        self
    }

    pub fn with_variation(mut self, variation: Variation) -> Self {
        self.variations.push(variation);
        self
    }
}

fn check_order_bounds(min: u32, max: Option<u32>) -> Result<(), ModelError> {
    if min == 0 {
        return Err(ModelError::invalid("minOrderQuantity must be at least 1"));
    }
    if let Some(max) = max {
        if max < min {
            return Err(ModelError::invalid("maxOrderQuantity must not be below minOrderQuantity"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrp_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selling_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_unit: Option<WeightUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_order_quantity: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hsn_code: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_food_item: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fssai_license: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "json_strings::serialize_opt")]
    pub variations: Option<Vec<Variation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductPatch {
    pub fn touched(mut self) -> Self {
        self.updated_at = Some(Utc::now());
        self
    }
}

impl ResourcePatch for ProductPatch {
    type Target = Product;

    fn normalize(&mut self) {
        if let Some(name) = &mut self.name {
            *name = name.trim().to_string();
        }
        if let Some(category) = &mut self.category_id {
            *category = category.trim().to_string();
        }
        if let Some(brand) = self.brand_id.as_mut() {
            *brand = brand.as_deref().and_then(trimmed);
        }
        if let Some(tags) = &mut self.tags {
            *tags = tags.iter().filter_map(|t| trimmed(t)).collect();
        }
        if let (Some(name), Some(variations)) = (&self.name, &mut self.variations) {
            for v in variations.iter_mut().filter(|v| v.name.trim().is_empty()) {
                v.name = name.clone();
            }
        }
    }

    fn apply_to(&self, target: &mut Product) {
        merge(&mut target.name, &self.name);
        merge(&mut target.description, &self.description);
        merge(&mut target.product_type, &self.product_type);
        merge(&mut target.category_id, &self.category_id);
        merge(&mut target.brand_id, &self.brand_id);
        merge(&mut target.mrp_price, &self.mrp_price);
        merge(&mut target.purchase_price, &self.purchase_price);
        merge(&mut target.selling_price, &self.selling_price);
        merge(&mut target.discount, &self.discount);
        merge(&mut target.weight, &self.weight);
        merge(&mut target.weight_unit, &self.weight_unit);
        merge(&mut target.stock, &self.stock);
        merge(&mut target.min_order_quantity, &self.min_order_quantity);
        merge(&mut target.max_order_quantity, &self.max_order_quantity);
        merge(&mut target.barcode, &self.barcode);
        merge(&mut target.hsn_code, &self.hsn_code);
        merge(&mut target.tags, &self.tags);
        merge(&mut target.is_food_item, &self.is_food_item);
        merge(&mut target.fssai_license, &self.fssai_license);
        merge(&mut target.images, &self.images);
        merge(&mut target.image_urls, &self.image_urls);
        merge(&mut target.variations, &self.variations);
        merge(&mut target.status, &self.status);
        if self.updated_at.is_some() {
            target.updated_at = self.updated_at;
        }
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        if let Some(id) = &self.category_id {
            refs.push(Reference::new("categoryId", ResourceKind::Category, id.clone()));
        }
        if let Some(Some(id)) = &self.brand_id {
            refs.push(Reference::new("brandId", ResourceKind::Brand, id.clone()));
        }
        refs
    }

    fn display_name(&self) -> Option<&str> { self.name.as_deref() }

    /// Replaces the whole gallery with the single new image.
    fn set_media(&mut self, media: Option<MediaRef>) {
        match media {
            Some(m) => {
                self.images = Some(vec![m.asset_id]);
                self.image_urls = Some(vec![m.url]);
            }
            None => {
                self.images = Some(Vec::new());
                self.image_urls = Some(Vec::new());
            }
        }
    }
}

const SCHEMA: &[AttributeSpec] = &[
    AttributeSpec::string("name", 256).required(),
    AttributeSpec::string("description", 8192),
    AttributeSpec::enumeration("productType", ProductType::ELEMENTS).required(),
    AttributeSpec::string("categoryId", 64).required(),
    AttributeSpec::string("brandId", 64),
    AttributeSpec::float("mrpPrice").required(),
    AttributeSpec::float("purchasePrice"),
    AttributeSpec::float("sellingPrice").required(),
    AttributeSpec::float("discount"),
    AttributeSpec::float("weight"),
    AttributeSpec::enumeration("weightUnit", WeightUnit::ELEMENTS),
    AttributeSpec::integer("stock"),
    AttributeSpec::integer("minOrderQuantity"),
    AttributeSpec::integer("maxOrderQuantity"),
    AttributeSpec::string("barcode", 64),
    AttributeSpec::string("hsnCode", 16),
    AttributeSpec::string("tags", 64).array(),
    AttributeSpec::boolean("isFoodItem"),
    AttributeSpec::string("fssaiLicense", 32),
    AttributeSpec::string("countryOfOrigin", 64),
    AttributeSpec::string("images", 64).array(),
    AttributeSpec::string("imageUrls", 512).array(),
    AttributeSpec::string("variations", 2048).array(),
    AttributeSpec::enumeration("status", &["active", "inactive"]),
    AttributeSpec::datetime("createdAt").required(),
    AttributeSpec::datetime("updatedAt"),
];

const INDEXES: &[IndexSpec] = &[
    CREATED_AT_DESC,
    IndexSpec { key: "idx_category", kind: IndexKind::Key, attributes: &["categoryId"], orders: &[SortOrder::Asc] },
    IndexSpec { key: "idx_brand", kind: IndexKind::Key, attributes: &["brandId"], orders: &[SortOrder::Asc] },
    IndexSpec { key: "idx_name_search", kind: IndexKind::Fulltext, attributes: &["name"], orders: &[] },
];

impl Resource for Product {
    const KIND: ResourceKind = ResourceKind::Product;
    type Patch = ProductPatch;

    fn display_name(&self) -> &str { &self.name }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.category_id = self.category_id.trim().to_string();
        if self.brand_id.as_deref().map(str::trim) == Some("") {
            self.brand_id = None;
        }
        self.tags = self
            .tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        for v in &mut self.variations {
            if v.name.trim().is_empty() {
                v.name = self.name.clone();
            }
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_name("product", &self.name)?;
        validate_reference("categoryId", &self.category_id)?;
        validate_non_negative("mrpPrice", self.mrp_price)?;
        validate_non_negative("sellingPrice", self.selling_price)?;
        if let Some(p) = self.purchase_price {
            validate_non_negative("purchasePrice", p)?;
        }
        if let Some(w) = self.weight {
            validate_non_negative("weight", w)?;
        }
        check_order_bounds(self.min_order_quantity, self.max_order_quantity)?;
        if self.is_food_item && self.fssai_license.as_deref().map_or(true, |l| l.trim().is_empty()) {
            return Err(ModelError::invalid("FSSAI license is required for food items"));
        }
        if self.images.len() != self.image_urls.len() {
            return Err(ModelError::invalid("images and imageUrls must pair up"));
        }
        self.variations.iter().try_for_each(Variation::validate)
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new("categoryId", ResourceKind::Category, self.category_id.clone())];
        if let Some(brand) = &self.brand_id {
            refs.push(Reference::new("brandId", ResourceKind::Brand, brand.clone()));
        }
        refs
    }

    fn media_assets(&self) -> Vec<String> { self.images.clone() }

    fn attach_media(&mut self, media: MediaRef) {
        self.images.push(media.asset_id);
        self.image_urls.push(media.url);
    }

    fn schema() -> &'static [AttributeSpec] { SCHEMA }

    fn indexes() -> &'static [IndexSpec] { INDEXES }
}
