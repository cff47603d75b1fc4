//! HTTPS adapter for an Appwrite-compatible REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use configs::BackendConfig;
use models::schema::{AttributeKind, AttributeSpec, IndexSpec};

use super::{
    Account, AccountApi, BackendError, DocumentList, DocumentStore, FileUpload, ObjectStore, Query, SchemaApi,
    Session, StoredFile,
};

const COLLECTION_PERMISSIONS: [&str; 4] = [r#"read("any")"#, r#"create("users")"#, r#"update("users")"#, r#"delete("users")"#];
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Clone)]
pub struct AppwriteBackend {
    client: reqwest::Client,
    endpoint: String,
    database_id: String,
}

impl AppwriteBackend {
    /// Build a client with the project (and optional server key) headers and
    /// a cookie store holding the account session.
    pub fn new(cfg: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        let project = HeaderValue::from_str(&cfg.project_id)
            .map_err(|e| BackendError::Transport(format!("invalid project id header: {e}")))?;
        headers.insert("X-Appwrite-Project", project);
        if let Some(key) = &cfg.api_key {
            match HeaderValue::from_str(key) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert("X-Appwrite-Key", value);
                }
                Err(err) => warn!("ignoring invalid api key header value: {}", err),
            }
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("grocer-admin/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            database_id: cfg.database_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String { format!("{}{}", self.endpoint, path) }

    fn collections_path(&self) -> String { format!("/databases/{}/collections", self.database_id) }

    fn documents_path(&self, collection: &str) -> String {
        format!("{}/{}/documents", self.collections_path(), collection)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request.send().await.map_err(|e| BackendError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "backend_request_failed");
        Err(error_from_response(status, &body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = self.send(request).await?;
        response.json::<T>().await.map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), BackendError> {
        self.send(request).await.map(|_| ())
    }
}

/// Decode `{"message","code","type"}` bodies; fall back to the raw text.
fn error_from_response(status: StatusCode, body: &str) -> BackendError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) if err.kind.is_empty() => err.message,
        Ok(err) => format!("{} ({})", err.message, err.kind),
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => body.to_string(),
    };
    match status {
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        StatusCode::CONFLICT => BackendError::Conflict(message),
        other => BackendError::Rejected { status: other.as_u16(), message },
    }
}

fn attribute_body(spec: &AttributeSpec) -> Value {
    let mut body = json!({ "key": spec.key, "required": spec.required, "array": spec.array });
    match spec.kind {
        AttributeKind::String { size } => body["size"] = json!(size),
        AttributeKind::Enum { elements } => body["elements"] = json!(elements),
        _ => {}
    }
    body
}

#[async_trait]
impl DocumentStore for AppwriteBackend {
    async fn create_document(&self, collection: &str, document_id: &str, data: Value) -> Result<Value, BackendError> {
        let request = self
            .client
            .post(self.url(&self.documents_path(collection)))
            .json(&json!({ "documentId": document_id, "data": data }));
        self.send_json(request).await
    }

    async fn get_document(&self, collection: &str, document_id: &str) -> Result<Value, BackendError> {
        let path = format!("{}/{}", self.documents_path(collection), document_id);
        self.send_json(self.client.get(self.url(&path))).await
    }

    async fn list_documents(&self, collection: &str, queries: &[Query]) -> Result<DocumentList, BackendError> {
        let params: Vec<(&str, String)> = queries.iter().map(|q| ("queries[]", q.encode())).collect();
        let request = self.client.get(self.url(&self.documents_path(collection))).query(&params);
        self.send_json(request).await
    }

    async fn update_document(&self, collection: &str, document_id: &str, data: Value) -> Result<Value, BackendError> {
        let path = format!("{}/{}", self.documents_path(collection), document_id);
        let request = self.client.patch(self.url(&path)).json(&json!({ "data": data }));
        self.send_json(request).await
    }

    async fn delete_document(&self, collection: &str, document_id: &str) -> Result<(), BackendError> {
        let path = format!("{}/{}", self.documents_path(collection), document_id);
        self.send_empty(self.client.delete(self.url(&path))).await
    }
}

#[async_trait]
impl ObjectStore for AppwriteBackend {
    async fn create_file(&self, bucket: &str, file_id: &str, upload: FileUpload) -> Result<StoredFile, BackendError> {
        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.content_type)
            .map_err(|e| BackendError::Rejected { status: 400, message: format!("invalid content type: {e}") })?;
        let form = Form::new().text("fileId", file_id.to_string()).part("file", part);
        let request = self.client.post(self.url(&format!("/storage/buckets/{bucket}/files"))).multipart(form);
        self.send_json(request).await
    }

    async fn delete_file(&self, bucket: &str, file_id: &str) -> Result<(), BackendError> {
        let path = format!("/storage/buckets/{bucket}/files/{file_id}");
        self.send_empty(self.client.delete(self.url(&path))).await
    }
}

#[async_trait]
impl AccountApi for AppwriteBackend {
    async fn create_account(&self, user_id: &str, email: &str, password: &str, name: &str) -> Result<Account, BackendError> {
        let body = json!({ "userId": user_id, "email": email, "password": password, "name": name });
        self.send_json(self.client.post(self.url("/account")).json(&body)).await
    }

    async fn create_email_session(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let body = json!({ "email": email, "password": password });
        self.send_json(self.client.post(self.url("/account/sessions/email")).json(&body)).await
    }

    async fn get_account(&self) -> Result<Account, BackendError> {
        self.send_json(self.client.get(self.url("/account"))).await
    }

    async fn delete_current_session(&self) -> Result<(), BackendError> {
        self.send_empty(self.client.delete(self.url("/account/sessions/current"))).await
    }
}

#[async_trait]
impl SchemaApi for AppwriteBackend {
    async fn create_collection(&self, collection_id: &str, name: &str) -> Result<(), BackendError> {
        let body = json!({
            "collectionId": collection_id,
            "name": name,
            "permissions": COLLECTION_PERMISSIONS,
            "documentSecurity": false,
        });
        self.send_empty(self.client.post(self.url(&self.collections_path())).json(&body)).await
    }

    async fn create_attribute(&self, collection_id: &str, spec: &AttributeSpec) -> Result<(), BackendError> {
        let path = format!("{}/{}/attributes/{}", self.collections_path(), collection_id, spec.kind.endpoint());
        self.send_empty(self.client.post(self.url(&path)).json(&attribute_body(spec))).await
    }

    async fn create_index(&self, collection_id: &str, spec: &IndexSpec) -> Result<(), BackendError> {
        let path = format!("{}/{}/indexes", self.collections_path(), collection_id);
        let orders: Vec<&str> = spec.orders.iter().map(|o| o.as_str()).collect();
        let body = json!({
            "key": spec.key,
            "type": spec.kind.as_str(),
            "attributes": spec.attributes,
            "orders": orders,
        });
        self.send_empty(self.client.post(self.url(&path)).json(&body)).await
    }

    async fn create_bucket(&self, bucket_id: &str, name: &str, max_file_size: u64) -> Result<(), BackendError> {
        let body = json!({
            "bucketId": bucket_id,
            "name": name,
            "permissions": COLLECTION_PERMISSIONS,
            "fileSecurity": false,
            "maximumFileSize": max_file_size,
            "allowedFileExtensions": IMAGE_EXTENSIONS,
        });
        self.send_empty(self.client.post(self.url("/storage/buckets")).json(&body)).await
    }
}
