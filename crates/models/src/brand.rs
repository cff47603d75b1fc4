use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::resource::{default_true, merge, trimmed, MediaRef, Resource, ResourceKind, ResourcePatch};
use crate::schema::{AttributeSpec, IndexSpec, CREATED_AT_DESC};
use crate::validation::validate_name;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SponsorshipType {
    #[default]
    None,
    Featured,
    Premium,
    Exclusive,
}

impl SponsorshipType {
    pub const ELEMENTS: &'static [&'static str] = &["none", "featured", "premium", "exclusive"];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_sponsored: bool,
    #[serde(default)]
    pub sponsorship_type: SponsorshipType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsorship_start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsorship_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Brand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            description: None,
            icon: None,
            icon_url: None,
            is_active: true,
            is_sponsored: false,
            sponsorship_type: SponsorshipType::None,
            sponsorship_start_date: None,
            sponsorship_end_date: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn sponsored(
        mut self,
        kind: SponsorshipType,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.is_sponsored = true;
        self.sponsorship_type = kind;
        self.sponsorship_start_date = start;
        self.sponsorship_end_date = end;
        self
    }

    /// Whether the sponsorship window covers `at`. Open-ended bounds count as covered.
    pub fn is_sponsorship_active(&self, at: DateTime<Utc>) -> bool {
        self.is_sponsored
            && self.sponsorship_type != SponsorshipType::None
            && self.sponsorship_start_date.map_or(true, |s| s <= at)
            && self.sponsorship_end_date.map_or(true, |e| at <= e)
    }
}

fn check_window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<(), ModelError> {
    if let (Some(s), Some(e)) = (start, end) {
        if e < s {
            return Err(ModelError::invalid("sponsorship end date precedes start date"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandPatch {
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
    pub is_sponsored: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsorship_type: Option<SponsorshipType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsorship_start_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sponsorship_end_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BrandPatch {
    pub fn touched(mut self) -> Self {
        self.updated_at = Some(Utc::now());
        self
    }

    /// Turning sponsorship off also resets its type and dates.
    pub fn end_sponsorship(mut self) -> Self {
        self.is_sponsored = Some(false);
        self.sponsorship_type = Some(SponsorshipType::None);
        self.sponsorship_start_date = Some(None);
        self.sponsorship_end_date = Some(None);
        self
    }
}

impl ResourcePatch for BrandPatch {
    type Target = Brand;

    fn normalize(&mut self) {
        if let Some(name) = &mut self.name {
            *name = name.trim().to_string();
        }
        if let Some(d) = self.description.as_mut() {
            *d = d.as_deref().and_then(trimmed);
        }
        if self.is_sponsored == Some(false) {
            *self = std::mem::take(self).end_sponsorship();
        }
    }

    fn apply_to(&self, target: &mut Brand) {
        merge(&mut target.name, &self.name);
        merge(&mut target.description, &self.description);
        merge(&mut target.icon, &self.icon);
        merge(&mut target.icon_url, &self.icon_url);
        merge(&mut target.is_active, &self.is_active);
        merge(&mut target.is_sponsored, &self.is_sponsored);
        merge(&mut target.sponsorship_type, &self.sponsorship_type);
        merge(&mut target.sponsorship_start_date, &self.sponsorship_start_date);
        merge(&mut target.sponsorship_end_date, &self.sponsorship_end_date);
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
    AttributeSpec::boolean("isSponsored"),
    AttributeSpec::enumeration("sponsorshipType", SponsorshipType::ELEMENTS),
    AttributeSpec::datetime("sponsorshipStartDate"),
    AttributeSpec::datetime("sponsorshipEndDate"),
    AttributeSpec::datetime("createdAt").required(),
    AttributeSpec::datetime("updatedAt"),
];

const INDEXES: &[IndexSpec] = &[CREATED_AT_DESC];

impl Resource for Brand {
    const KIND: ResourceKind = ResourceKind::Brand;
    type Patch = BrandPatch;

    fn display_name(&self) -> &str { &self.name }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        if !self.is_sponsored {
            self.sponsorship_type = SponsorshipType::None;
            self.sponsorship_start_date = None;
            self.sponsorship_end_date = None;
        }
    }

    fn validate(&self) -> Result<(), ModelError> {
        validate_name("brand", &self.name)?;
        if self.is_sponsored && self.sponsorship_type == SponsorshipType::None {
            return Err(ModelError::invalid("sponsorship type is required for sponsored brands"));
        }
        check_window(self.sponsorship_start_date, self.sponsorship_end_date)
    }

    fn media_assets(&self) -> Vec<String> { self.icon.iter().cloned().collect() }

    fn attach_media(&mut self, media: MediaRef) {
        self.icon = Some(media.asset_id);
        self.icon_url = Some(media.url);
    }

    fn schema() -> &'static [AttributeSpec] { SCHEMA }

    fn indexes() -> &'static [IndexSpec] { INDEXES }
}
