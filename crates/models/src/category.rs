use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::resource::{default_true, merge, trimmed, MediaRef, Resource, ResourceKind, ResourcePatch};
use crate::schema::{AttributeSpec, IndexKind, IndexSpec, SortOrder, CREATED_AT_DESC};
use crate::validation::validate_name;

/// Top-level product grouping shown in the storefront navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stored file id of the icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            description: None,
            icon: None,
            icon_url: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CategoryPatch {
    pub fn touched(mut self) -> Self {
        self.updated_at = Some(Utc::now());
        self
    }
}

impl ResourcePatch for CategoryPatch {
    type Target = Category;

    fn normalize(&mut self) {
        if let Some(name) = &mut self.name {
            *name = name.trim().to_string();
        }
        if let Some(d) = self.description.as_mut() {
            *d = d.as_deref().and_then(trimmed);
        }
    }

    fn apply_to(&self, target: &mut Category) {
        merge(&mut target.name, &self.name);
        merge(&mut target.description, &self.description);
        merge(&mut target.icon, &self.icon);
        merge(&mut target.icon_url, &self.icon_url);
        merge(&mut target.is_active, &self.is_active);
        if self.updated_at.is_some() {
            target.updated_at = self.updated_at;
        }
    }

    fn display_name(&self) -> Option<&str> { self.name.as_deref() }

    fn set_media(&mut self, media: Option<MediaRef>) {
        let (icon, url) = match media {
            Some(m) => (Some(m.asset_id), Some(m.url)),
            None => (None, None),
        };
        self.icon = Some(icon);
        self.icon_url = Some(url);
    }
}

const SCHEMA: &[AttributeSpec] = &[
    AttributeSpec::string("name", 128).required(),
    AttributeSpec::string("description", 2048),
    AttributeSpec::string("icon", 64),
    AttributeSpec::string("iconUrl", 512),
    AttributeSpec::boolean("isActive"),
    AttributeSpec::datetime("createdAt").required(),
    AttributeSpec::datetime("updatedAt"),
];

const INDEXES: &[IndexSpec] = &[
    CREATED_AT_DESC,
    IndexSpec { key: "idx_name", kind: IndexKind::Key, attributes: &["name"], orders: &[SortOrder::Asc] },
];

impl Resource for Category {
    const KIND: ResourceKind = ResourceKind::Category;
    type Patch = CategoryPatch;

    fn display_name(&self) -> &str { &self.name }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.description = self.description.as_deref().and_then(trimmed);
    }

    fn validate(&self) -> Result<(), ModelError> { validate_name("category", &self.name) }

    fn media_assets(&self) -> Vec<String> { self.icon.iter().cloned().collect() }

    fn attach_media(&mut self, media: MediaRef) {
        self.icon = Some(media.asset_id);
        self.icon_url = Some(media.url);
    }

    fn schema() -> &'static [AttributeSpec] { SCHEMA }

    fn indexes() -> &'static [IndexSpec] { INDEXES }
}
