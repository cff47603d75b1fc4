use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::schema::{AttributeSpec, IndexKind, IndexSpec, SortOrder};
use crate::validation::{validate_email, validate_name};

pub const ADMIN_ROLE: &str = "admin";

/// Per-account profile document. Its id equals the account id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            role: None,
            created_at: Utc::now(),
        }
    }

    pub fn admin(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self { role: Some(ADMIN_ROLE.to_string()), ..Self::new(name, email) }
    }

    pub fn is_admin(&self) -> bool { self.role.as_deref() == Some(ADMIN_ROLE) }

    pub fn validate(&self) -> Result<(), ModelError> {
        validate_name("user", &self.name)?;
        validate_email(&self.email)
    }

    pub fn schema() -> &'static [AttributeSpec] { SCHEMA }

    pub fn indexes() -> &'static [IndexSpec] { INDEXES }
}

/// Editable profile fields. Role is not part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfilePatch {
    pub fn validate(&self) -> Result<(), ModelError> {
        if let Some(name) = &self.name {
            validate_name("user", name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, profile: &mut UserProfile) {
        if let Some(name) = &self.name {
            profile.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            profile.email = email.trim().to_string();
        }
    }
}

const SCHEMA: &[AttributeSpec] = &[
    AttributeSpec::string("name", 128).required(),
    AttributeSpec::string("email", 320).required(),
    AttributeSpec::string("role", 32),
    AttributeSpec::datetime("createdAt").required(),
];

const INDEXES: &[IndexSpec] = &[IndexSpec {
    key: "idx_email",
    kind: IndexKind::Unique,
    attributes: &["email"],
    orders: &[SortOrder::Asc],
}];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_admin_role_is_privileged() {
        assert!(UserProfile::admin("Ops", "ops@grocer.in").is_admin());
        assert!(!UserProfile::new("Asha", "asha@grocer.in").is_admin());
        let mut odd = UserProfile::new("Ravi", "ravi@grocer.in");
        odd.role = Some("Admin".into());
        assert!(!odd.is_admin());
    }

    #[test]
    fn patch_merges_trimmed_fields() {
        let mut profile = UserProfile::new("Asha", "asha@grocer.in");
        let patch = ProfilePatch { name: Some(" Asha K ".into()), email: None };
        assert!(patch.validate().is_ok());
        patch.apply_to(&mut profile);
        assert_eq!(profile.name, "Asha K");
        assert_eq!(profile.email, "asha@grocer.in");
    }
}
