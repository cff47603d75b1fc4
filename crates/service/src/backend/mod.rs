//! Backend abstraction: the document store, object store and account API the
//! services talk to, plus the two implementations shipped with the crate.

pub mod appwrite;
pub mod memory;
pub mod query;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use models::schema::{AttributeSpec, IndexSpec};

pub use appwrite::AppwriteBackend;
pub use memory::MemoryBackend;
pub use query::Query;

/// Id placeholder asking the backend to generate a fresh id.
pub const ID_UNIQUE: &str = "unique()";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// One page of raw documents plus the total matching count.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentList {
    pub total: u64,
    pub documents: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "bucketId", default)]
    pub bucket_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(rename = "sizeOriginal", default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(&self, collection: &str, document_id: &str, data: Value) -> Result<Value, BackendError>;
    async fn get_document(&self, collection: &str, document_id: &str) -> Result<Value, BackendError>;
    async fn list_documents(&self, collection: &str, queries: &[Query]) -> Result<DocumentList, BackendError>;
    async fn update_document(&self, collection: &str, document_id: &str, data: Value) -> Result<Value, BackendError>;
    async fn delete_document(&self, collection: &str, document_id: &str) -> Result<(), BackendError>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create_file(&self, bucket: &str, file_id: &str, upload: FileUpload) -> Result<StoredFile, BackendError>;
    async fn delete_file(&self, bucket: &str, file_id: &str) -> Result<(), BackendError>;
}

/// Email/password accounts and the session bound to this client.
#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn create_account(&self, user_id: &str, email: &str, password: &str, name: &str) -> Result<Account, BackendError>;
    async fn create_email_session(&self, email: &str, password: &str) -> Result<Session, BackendError>;
    async fn get_account(&self) -> Result<Account, BackendError>;
    async fn delete_current_session(&self) -> Result<(), BackendError>;
}

/// Collection, attribute, index and bucket creation. `Conflict` means the
/// object already exists.
#[async_trait]
pub trait SchemaApi: Send + Sync {
    async fn create_collection(&self, collection_id: &str, name: &str) -> Result<(), BackendError>;
    async fn create_attribute(&self, collection_id: &str, spec: &AttributeSpec) -> Result<(), BackendError>;
    async fn create_index(&self, collection_id: &str, spec: &IndexSpec) -> Result<(), BackendError>;
    async fn create_bucket(&self, bucket_id: &str, name: &str, max_file_size: u64) -> Result<(), BackendError>;
}
