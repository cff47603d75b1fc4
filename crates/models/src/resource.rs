use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::errors::ModelError;
use crate::schema::{AttributeSpec, IndexSpec};

/// The four entity kinds managed by the admin console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Category,
    SubCategory,
    Brand,
    Product,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Category,
        ResourceKind::SubCategory,
        ResourceKind::Brand,
        ResourceKind::Product,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::Category => "category",
            ResourceKind::SubCategory => "sub-category",
            ResourceKind::Brand => "brand",
            ResourceKind::Product => "product",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An id stored on one entity that must name an existing entity of `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub kind: ResourceKind,
    pub id: String,
}

impl Reference {
    pub fn new(field: &'static str, kind: ResourceKind, id: impl Into<String>) -> Self {
        Self { field, kind, id: id.into() }
    }
}

/// A stored file together with its derived retrieval URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub asset_id: String,
    pub url: String,
}

/// A stored record: the backend-assigned id plus the entity fields.
///
/// Backend bookkeeping attributes (`$createdAt`, `$permissions`, ...) are
/// ignored on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Deref for Document<T> {
    type Target = T;
    fn deref(&self) -> &T { &self.data }
}

impl<T> DerefMut for Document<T> {
    fn deref_mut(&mut self) -> &mut T { &mut self.data }
}

/// Per-entity behaviour plugged into the generic resource service.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    /// Partial-update payload for this entity.
    type Patch: ResourcePatch<Target = Self>;

    /// Human-readable name, also used to derive upload file names.
    fn display_name(&self) -> &str;

    /// Canonicalise caller input (trim names, clear fields that do not apply).
    fn normalize(&mut self) {}

    fn validate(&self) -> Result<(), ModelError>;

    /// Ids that must resolve to existing records before a write.
    fn references(&self) -> Vec<Reference> { Vec::new() }

    /// Stored file ids owned by this record.
    fn media_assets(&self) -> Vec<String>;

    /// Record a freshly uploaded file and its URL on the entity.
    fn attach_media(&mut self, media: MediaRef);

    /// Attribute layout of the backing collection.
    fn schema() -> &'static [AttributeSpec];

    fn indexes() -> &'static [IndexSpec] { &[] }
}

/// Partial update: only fields that are `Some` are written.
///
/// A patch is never validated on its own. The service applies it to the
/// stored record and validates the result with [`Resource::validate`].
pub trait ResourcePatch: Serialize + Default + Clone + Send + Sync + 'static {
    type Target;

    /// Canonicalise the carried fields the same way `Resource::normalize`
    /// does for a full record.
    fn normalize(&mut self) {}

    /// Overwrite the fields of `target` that this patch carries.
    fn apply_to(&self, target: &mut Self::Target);

    fn references(&self) -> Vec<Reference> { Vec::new() }

    /// New name carried by the patch, if any.
    fn display_name(&self) -> Option<&str> { None }

    /// Replace the media fields; `None` clears them.
    fn set_media(&mut self, media: Option<MediaRef>);

    fn is_empty(&self) -> bool {
        matches!(serde_json::to_value(self), Ok(serde_json::Value::Object(map)) if map.is_empty())
    }
}

pub(crate) fn default_true() -> bool { true }

/// Copy a carried patch value into its slot on the record.
pub(crate) fn merge<V: Clone>(slot: &mut V, value: &Option<V>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

/// Trimmed copy, or `None` when nothing is left.
pub(crate) fn trimmed(value: &str) -> Option<String> {
    let t = value.trim();
    (!t.is_empty()).then(|| t.to_string())
}
