use thiserror::Error;

use models::errors::ModelError;

use crate::backend::BackendError;

/// Business errors for auth workflows
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("user already exists")]
    Conflict,
    #[error("user not found")]
    NotFound,
    #[error("invalid credentials or no active session")]
    Unauthorized,
    #[error("backend error: {0}")]
    Backend(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict => 1002,
            AuthError::NotFound => 1003,
            AuthError::Unauthorized => 1004,
            AuthError::Backend(_) => 1200,
        }
    }
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(_) => AuthError::NotFound,
            BackendError::Unauthorized(_) => AuthError::Unauthorized,
            BackendError::Conflict(_) => AuthError::Conflict,
            other => AuthError::Backend(other.to_string()),
        }
    }
}

impl From<ModelError> for AuthError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(msg) => AuthError::Validation(msg),
        }
    }
}
