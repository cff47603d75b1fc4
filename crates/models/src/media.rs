//! Client-side checks and naming for uploaded images.
//!
//! Everything here runs before the backend is contacted, so a rejected
//! upload never produces a network call.

use thiserror::Error;

/// Accepted declared content types.
pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("invalid asset type: {0} (expected JPG or PNG)")]
    InvalidType(String),
    #[error("asset too large: {size} bytes exceeds {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
}

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl AssetUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), content_type: content_type.into(), bytes }
    }

    pub fn size(&self) -> u64 { self.bytes.len() as u64 }

    /// Type is checked before size.
    pub fn check(&self, max_bytes: u64) -> Result<(), MediaError> {
        let declared = self.content_type.trim().to_ascii_lowercase();
        if !ALLOWED_IMAGE_TYPES.contains(&declared.as_str()) {
            return Err(MediaError::InvalidType(self.content_type.clone()));
        }
        if self.size() > max_bytes {
            return Err(MediaError::TooLarge { size: self.size(), limit: max_bytes });
        }
        Ok(())
    }

    /// Extension for the declared content type. The caller's file name is
    /// ignored, so the stored name always matches an accepted type.
    pub fn extension(&self) -> &'static str {
        if self.content_type.trim().eq_ignore_ascii_case("image/png") {
            "png"
        } else {
            "jpg"
        }
    }

    /// `<sanitized-name>-<unix-seconds>.<ext>`, or `<unix-seconds>.<ext>`
    /// when no usable entity name is given.
    pub fn stored_name(&self, entity_name: Option<&str>, unix_seconds: i64) -> String {
        let ext = self.extension();
        match entity_name.map(sanitize_name).filter(|n| !n.is_empty()) {
            Some(prefix) => format!("{prefix}-{unix_seconds}.{ext}"),
            None => format!("{unix_seconds}.{ext}"),
        }
    }
}

/// Lowercase, with every character outside `[a-z0-9]` replaced by `-`.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: usize = 1024 * 1024;

    #[test]
    fn type_is_checked_before_size() {
        let gif = AssetUpload::new("big.gif", "image/gif", vec![0; 3 * MB]);
        assert_eq!(gif.check(2 * MB as u64), Err(MediaError::InvalidType("image/gif".into())));

        let png = AssetUpload::new("big.png", "image/png", vec![0; 2 * MB + 1]);
        assert!(matches!(png.check(2 * MB as u64), Err(MediaError::TooLarge { .. })));

        let exact = AssetUpload::new("ok.jpg", "image/jpeg", vec![0; 2 * MB]);
        assert!(exact.check(2 * MB as u64).is_ok());
    }

    #[test]
    fn declared_type_is_case_insensitive() {
        let upload = AssetUpload::new("a.JPG", "IMAGE/JPG", vec![1]);
        assert!(upload.check(10).is_ok());
        assert_eq!(upload.extension(), "jpg");
    }

    #[test]
    fn stored_name_embeds_sanitized_entity_name() {
        let upload = AssetUpload::new("Logo.PNG", "image/png", vec![1]);
        assert_eq!(upload.stored_name(Some("Amul Dairy & Co."), 1_700_000_000), "amul-dairy---co--1700000000.png");
        assert_eq!(upload.stored_name(None, 1_700_000_000), "1700000000.png");
        assert_eq!(upload.stored_name(Some("   "), 42), "42.png");
    }

    #[test]
    fn extension_follows_declared_type_not_file_name() {
        assert_eq!(AssetUpload::new("icon", "image/png", vec![]).extension(), "png");
        assert_eq!(AssetUpload::new("icon.", "image/jpeg", vec![]).extension(), "jpg");

        let renamed = AssetUpload::new("logo.webp", "image/png", vec![1]);
        assert!(renamed.check(10).is_ok());
        assert_eq!(renamed.stored_name(Some("Dairy"), 7), "dairy-7.png");
        assert_eq!(AssetUpload::new("scan.PNG", "image/jpeg", vec![]).extension(), "jpg");
    }
}
