use thiserror::Error;

use models::errors::ModelError;
use models::media::MediaError;

use crate::backend::BackendError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote read failed: {0}")]
    RemoteRead(String),
    #[error("remote write failed: {0}")]
    RemoteWrite(String),
    #[error("asset too large: {size} bytes exceeds the {limit} byte limit")]
    AssetTooLarge { size: u64, limit: u64 },
    #[error("invalid asset type: {0}")]
    InvalidAssetType(String),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

impl ServiceError {
    /// Map a backend failure raised while reading.
    pub fn read(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(msg) => Self::NotFound(msg),
            other => Self::RemoteRead(other.to_string()),
        }
    }

    /// Map a backend failure raised while writing.
    pub fn write(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(msg) => Self::NotFound(msg),
            other => Self::RemoteWrite(other.to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }
}

impl From<MediaError> for ServiceError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::InvalidType(mime) => Self::InvalidAssetType(mime),
            MediaError::TooLarge { size, limit } => Self::AssetTooLarge { size, limit },
        }
    }
}
