use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::resource::{default_true, merge, trimmed, MediaRef, Reference, Resource, ResourceKind, ResourcePatch};
use crate::schema::{AttributeSpec, IndexKind, IndexSpec, SortOrder, CREATED_AT_DESC};
use crate::validation::{validate_name, validate_reference};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub name: String,
    pub parent_category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SubCategory {
    pub fn new(name: impl Into<String>, parent_category_id: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            parent_category_id: parent_category_id.into(),
            description: None,
            image: None,
            image_url: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Moving a sub-category re-checks that the new parent exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SubCategoryPatch {
    pub fn touched(mut self) -> Self {
        self.updated_at = Some(Utc::now());
        self
    }
}

impl ResourcePatch for SubCategoryPatch {
    type Target = SubCategory;

    fn normalize(&mut self) {
        if let Some(name) = &mut self.name {
            *name = name.trim().to_string();
        }
        if let Some(parent) = &mut self.parent_category_id {
            *parent = parent.trim().to_string();
        }
        if let Some(d) = self.description.as_mut() {
            *d = d.as_deref().and_then(trimmed);
        }
    }

    fn apply_to(&self, target: &mut SubCategory) {
        merge(&mut target.name, &self.name);
        merge(&mut target.parent_category_id, &self.parent_category_id);
        merge(&mut target.description, &self.description);
        merge(&mut target.image, &self.image);
        merge(&mut target.image_url, &self.image_url);
        merge(&mut target.is_active, &self.is_active);
        if self.updated_at.is_some() {
            target.updated_at = self.updated_at;
        }
    }

    fn references(&self) -> Vec<Reference> {
        self.parent_category_id
            .iter()
            .map(|id| Reference::new("parentCategoryId", ResourceKind::Category, id.clone()))
            .collect()
    }

    fn display_name(&self) -> Option<&str> { self.name.as_deref() }

    fn set_media(&mut self, media: Option<MediaRef>) {
        let (image, url) = match media {
            Some(m) => (Some(m.asset_id), Some(m.url)),
            None => (None, None),
        };
        self.image = Some(image);
        self.image_url = Some(url);
    }
}

const SCHEMA: &[AttributeSpec] = &[
    AttributeSpec::string("name", 128).required(),
    AttributeSpec::string("parentCategoryId", 64).required(),
    AttributeSpec::string("description", 2048),
    AttributeSpec::string("image", 64),
    AttributeSpec::string("imageUrl", 512),
    AttributeSpec::boolean("isActive"),
    AttributeSpec::datetime("createdAt").required(),
    AttributeSpec::datetime("updatedAt"),
];

const INDEXES: &[IndexSpec] = &[
    CREATED_AT_DESC,
    IndexSpec { key: "idx_parent", kind: IndexKind::Key, attributes: &["parentCategoryId"], orders: &[SortOrder::Asc] },
];

impl Resource for SubCategory {
    const KIND: ResourceKind = ResourceKind::SubCategory;
    type Patch = SubCategoryPatch;

    fn display_name(&self) -> &str { &self.name }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.parent_category_id = self.parent_category_id.trim().to_string();
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_name("sub-category", &self.name)?;
        validate_reference("parentCategoryId", &self.parent_category_id)
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::new("parentCategoryId", ResourceKind::Category, self.parent_category_id.clone())]
    }

    fn media_assets(&self) -> Vec<String> { self.image.iter().cloned().collect() }

    fn attach_media(&mut self, media: MediaRef) {
        self.image = Some(media.asset_id);
        self.image_url = Some(media.url);
    }

    fn schema() -> &'static [AttributeSpec] { SCHEMA }

    fn indexes() -> &'static [IndexSpec] { INDEXES }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_is_required_and_referenced() {
        let sub = SubCategory::new("Milk", " ");
        let mut normalized = sub.clone();
        normalized.normalize();
        assert!(normalized.validate().is_err());

        let sub = SubCategory::new("Milk", "cat-1");
        assert!(sub.validate().is_ok());
        assert_eq!(sub.references(), vec![Reference::new("parentCategoryId", ResourceKind::Category, "cat-1")]);
    }

    #[test]
    fn blank_parent_in_patch_fails_once_applied() {
        let mut patch = SubCategoryPatch {
            name: Some(" Toned Milk ".into()),
            parent_category_id: Some("  ".into()),
            ..Default::default()
        };
        patch.normalize();
        let mut sub = SubCategory::new("Milk", "cat-1");
        patch.apply_to(&mut sub);
        assert_eq!(sub.name, "Toned Milk");
        assert!(sub.validate().is_err());
    }

    #[test]
    fn patch_only_references_a_new_parent() {
        assert!(SubCategoryPatch::default().references().is_empty());
        let moved = SubCategoryPatch { parent_category_id: Some("cat-2".into()), ..Default::default() };
        assert_eq!(moved.references().len(), 1);
    }
}
