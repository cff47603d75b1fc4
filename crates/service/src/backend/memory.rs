//! In-process backend used by tests and local development.
//!
//! Mirrors the behaviour the services depend on: generated ids, `$id`
//! bookkeeping, `equal` filters, ordering, cursor paging and 404/409
//! semantics. Writes to a collection or bucket can be made to fail on demand
//! and every document/file call is counted, so tests can assert that a
//! rejected operation never reached the backend.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use models::schema::{AttributeSpec, IndexSpec};

use super::{
    Account, AccountApi, BackendError, DocumentList, DocumentStore, FileUpload, ObjectStore, Query, SchemaApi,
    Session, StoredFile, ID_UNIQUE,
};

/// Page size applied when a list call carries no `limit`.
pub const DEFAULT_LIST_LIMIT: usize = 25;

#[derive(Debug, Clone)]
struct StoredAccount {
    account: Account,
    password: String,
}

#[derive(Debug, Clone, Default)]
struct CollectionLayout {
    attributes: Vec<String>,
    indexes: Vec<String>,
}

#[derive(Default)]
pub struct MemoryBackend {
    documents: RwLock<HashMap<String, Vec<Value>>>,
    files: DashMap<(String, String), StoredFile>,
    accounts: DashMap<String, StoredAccount>,
    session: RwLock<Option<Session>>,
    collections: DashMap<String, CollectionLayout>,
    buckets: DashMap<String, u64>,
    rejecting: DashSet<String>,
    calls: AtomicUsize,
}

fn generate_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(20);
    id
}

fn resolve_id(requested: &str) -> String {
    if requested == ID_UNIQUE { generate_id() } else { requested.to_string() }
}

fn doc_id(doc: &Value) -> Option<&str> { doc.get("$id").and_then(Value::as_str) }

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            // timestamps differ in fractional-second width, so compare them as instants
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn matches_equal(doc: &Value, attribute: &str, expected: &Value) -> bool {
    let actual = doc.get(attribute).unwrap_or(&Value::Null);
    match expected {
        Value::Array(options) => options.iter().any(|o| o == actual),
        single => single == actual,
    }
}

fn not_found_document(collection: &str, id: &str) -> BackendError {
    BackendError::NotFound(format!("document {id} not found in {collection}"))
}

impl MemoryBackend {
    pub fn new() -> Self { Self::default() }

    /// Number of document and file calls served so far.
    pub fn calls(&self) -> usize { self.calls.load(AtomicOrdering::SeqCst) }

    /// Make every write against the named collection or bucket fail.
    pub fn reject_writes(&self, target: &str) { self.rejecting.insert(target.to_string()); }

    pub fn accept_writes(&self, target: &str) { self.rejecting.remove(target); }

    pub fn has_file(&self, bucket: &str, file_id: &str) -> bool {
        self.files.contains_key(&(bucket.to_string(), file_id.to_string()))
    }

    pub fn file_count(&self, bucket: &str) -> usize {
        self.files.iter().filter(|e| e.key().0 == bucket).count()
    }

    pub fn stored_file(&self, bucket: &str, file_id: &str) -> Option<StoredFile> {
        self.files.get(&(bucket.to_string(), file_id.to_string())).map(|f| f.value().clone())
    }

    pub async fn document_count(&self, collection: &str) -> usize {
        self.documents.read().await.get(collection).map_or(0, Vec::len)
    }

    pub fn attribute_keys(&self, collection: &str) -> Vec<String> {
        self.collections.get(collection).map(|c| c.attributes.clone()).unwrap_or_default()
    }

    pub fn index_keys(&self, collection: &str) -> Vec<String> {
        self.collections.get(collection).map(|c| c.indexes.clone()).unwrap_or_default()
    }

    pub fn has_bucket(&self, bucket: &str) -> bool { self.buckets.contains_key(bucket) }

    fn track(&self) { self.calls.fetch_add(1, AtomicOrdering::SeqCst); }

    fn guard_write(&self, target: &str) -> Result<(), BackendError> {
        if self.rejecting.contains(target) {
            return Err(BackendError::Rejected { status: 500, message: format!("writes to {target} are disabled") });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn create_document(&self, collection: &str, document_id: &str, data: Value) -> Result<Value, BackendError> {
        self.track();
        self.guard_write(collection)?;
        let Value::Object(fields) = data else {
            return Err(BackendError::Rejected { status: 400, message: "document data must be an object".into() });
        };

        let mut docs = self.documents.write().await;
        let entries = docs.entry(collection.to_string()).or_default();
        let id = resolve_id(document_id);
        if entries.iter().any(|d| doc_id(d) == Some(id.as_str())) {
            return Err(BackendError::Conflict(format!("document {id} already exists")));
        }

        let now = Utc::now().to_rfc3339();
        let mut doc = Map::new();
        doc.insert("$id".into(), Value::String(id));
        doc.insert("$collectionId".into(), Value::String(collection.to_string()));
        doc.insert("$createdAt".into(), Value::String(now.clone()));
        doc.insert("$updatedAt".into(), Value::String(now));
        doc.extend(fields.into_iter().filter(|(k, _)| !k.starts_with('$')));

        let doc = Value::Object(doc);
        entries.push(doc.clone());
        Ok(doc)
    }

    async fn get_document(&self, collection: &str, document_id: &str) -> Result<Value, BackendError> {
        self.track();
        let docs = self.documents.read().await;
        docs.get(collection)
            .and_then(|entries| entries.iter().find(|d| doc_id(d) == Some(document_id)))
            .cloned()
            .ok_or_else(|| not_found_document(collection, document_id))
    }

    async fn list_documents(&self, collection: &str, queries: &[Query]) -> Result<DocumentList, BackendError> {
        self.track();
        let docs = self.documents.read().await;
        let mut matched: Vec<(usize, &Value)> = docs
            .get(collection)
            .map(|entries| entries.iter().enumerate().collect())
            .unwrap_or_default();

        let mut orders: Vec<(&str, bool)> = Vec::new();
        let mut limit = DEFAULT_LIST_LIMIT;
        let mut cursor = None;
        for query in queries {
            match query {
                Query::Equal { attribute, value } => matched.retain(|(_, d)| matches_equal(d, attribute, value)),
                Query::OrderAsc(attr) => orders.push((attr.as_str(), false)),
                Query::OrderDesc(attr) => orders.push((attr.as_str(), true)),
                Query::Limit(n) => limit = *n as usize,
                Query::CursorAfter(id) => cursor = Some(id.as_str()),
            }
        }

        let newest_first = orders.first().is_some_and(|(_, desc)| *desc);
        matched.sort_by(|(ia, a), (ib, b)| {
            orders
                .iter()
                .map(|(attr, desc)| {
                    let ord = compare_values(a.get(*attr), b.get(*attr));
                    if *desc { ord.reverse() } else { ord }
                })
                .find(|o| o.is_ne())
                .unwrap_or_else(|| if newest_first { ib.cmp(ia) } else { ia.cmp(ib) })
        });

        let total = matched.len() as u64;
        let start = match cursor {
            Some(id) => {
                let pos = matched.iter().position(|(_, d)| doc_id(d) == Some(id)).ok_or_else(|| {
                    BackendError::Rejected { status: 400, message: format!("cursor document {id} not found") }
                })?;
                pos + 1
            }
            None => 0,
        };

        let documents = matched.into_iter().skip(start).take(limit).map(|(_, d)| d.clone()).collect();
        Ok(DocumentList { total, documents })
    }

    async fn update_document(&self, collection: &str, document_id: &str, data: Value) -> Result<Value, BackendError> {
        self.track();
        self.guard_write(collection)?;
        let Value::Object(fields) = data else {
            return Err(BackendError::Rejected { status: 400, message: "document data must be an object".into() });
        };

        let mut docs = self.documents.write().await;
        let doc = docs
            .get_mut(collection)
            .and_then(|entries| entries.iter_mut().find(|d| doc_id(d) == Some(document_id)))
            .ok_or_else(|| not_found_document(collection, document_id))?;
        if let Value::Object(existing) = &mut *doc {
            for (key, value) in fields.into_iter().filter(|(k, _)| !k.starts_with('$')) {
                existing.insert(key, value);
            }
            existing.insert("$updatedAt".into(), Value::String(Utc::now().to_rfc3339()));
        }
        Ok(doc.clone())
    }

    async fn delete_document(&self, collection: &str, document_id: &str) -> Result<(), BackendError> {
        self.track();
        self.guard_write(collection)?;
        let mut docs = self.documents.write().await;
        let entries = docs.get_mut(collection).ok_or_else(|| not_found_document(collection, document_id))?;
        let pos = entries
            .iter()
            .position(|d| doc_id(d) == Some(document_id))
            .ok_or_else(|| not_found_document(collection, document_id))?;
        entries.remove(pos);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn create_file(&self, bucket: &str, file_id: &str, upload: FileUpload) -> Result<StoredFile, BackendError> {
        self.track();
        self.guard_write(bucket)?;
        let id = resolve_id(file_id);
        let key = (bucket.to_string(), id.clone());
        if self.files.contains_key(&key) {
            return Err(BackendError::Conflict(format!("file {id} already exists")));
        }
        let stored = StoredFile {
            id,
            bucket_id: bucket.to_string(),
            name: upload.file_name,
            mime_type: upload.content_type,
            size: upload.bytes.len() as u64,
        };
        self.files.insert(key, stored.clone());
        Ok(stored)
    }

    async fn delete_file(&self, bucket: &str, file_id: &str) -> Result<(), BackendError> {
        self.track();
        self.guard_write(bucket)?;
        self.files
            .remove(&(bucket.to_string(), file_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(format!("file {file_id} not found in {bucket}")))
    }
}

#[async_trait]
impl AccountApi for MemoryBackend {
    async fn create_account(&self, user_id: &str, email: &str, password: &str, name: &str) -> Result<Account, BackendError> {
        let email = email.trim().to_lowercase();
        if self.accounts.contains_key(&email) {
            return Err(BackendError::Conflict("a user with the same email already exists".into()));
        }
        let account = Account { id: resolve_id(user_id), email: email.clone(), name: name.to_string() };
        self.accounts.insert(email, StoredAccount { account: account.clone(), password: password.to_string() });
        Ok(account)
    }

    async fn create_email_session(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let stored = self
            .accounts
            .get(&email.trim().to_lowercase())
            .filter(|a| a.password == password)
            .map(|a| a.account.clone())
            .ok_or_else(|| BackendError::Unauthorized("invalid credentials".into()))?;
        let session = Session { id: generate_id(), user_id: stored.id };
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    async fn get_account(&self) -> Result<Account, BackendError> {
        let session = self.session.read().await.clone().ok_or_else(|| BackendError::Unauthorized("no active session".into()))?;
        self.accounts
            .iter()
            .find(|a| a.account.id == session.user_id)
            .map(|a| a.account.clone())
            .ok_or_else(|| BackendError::NotFound(format!("user {} not found", session.user_id)))
    }

    async fn delete_current_session(&self) -> Result<(), BackendError> {
        let mut session = self.session.write().await;
        match session.take() {
            Some(_) => Ok(()),
            None => Err(BackendError::Unauthorized("no active session".into())),
        }
    }
}

#[async_trait]
impl SchemaApi for MemoryBackend {
    async fn create_collection(&self, collection_id: &str, _name: &str) -> Result<(), BackendError> {
        if self.collections.contains_key(collection_id) {
            return Err(BackendError::Conflict(format!("collection {collection_id} already exists")));
        }
        self.collections.insert(collection_id.to_string(), CollectionLayout::default());
        Ok(())
    }

    async fn create_attribute(&self, collection_id: &str, spec: &AttributeSpec) -> Result<(), BackendError> {
        let mut layout = self
            .collections
            .get_mut(collection_id)
            .ok_or_else(|| BackendError::NotFound(format!("collection {collection_id} not found")))?;
        if layout.attributes.iter().any(|k| k == spec.key) {
            return Err(BackendError::Conflict(format!("attribute {} already exists", spec.key)));
        }
        layout.attributes.push(spec.key.to_string());
        Ok(())
    }

    async fn create_index(&self, collection_id: &str, spec: &IndexSpec) -> Result<(), BackendError> {
        let mut layout = self
            .collections
            .get_mut(collection_id)
            .ok_or_else(|| BackendError::NotFound(format!("collection {collection_id} not found")))?;
        if let Some(missing) = spec.attributes.iter().find(|a| !layout.attributes.iter().any(|k| k == *a)) {
            return Err(BackendError::Rejected { status: 400, message: format!("unknown attribute {missing}") });
        }
        if layout.indexes.iter().any(|k| k == spec.key) {
            return Err(BackendError::Conflict(format!("index {} already exists", spec.key)));
        }
        layout.indexes.push(spec.key.to_string());
        Ok(())
    }

    async fn create_bucket(&self, bucket_id: &str, _name: &str, max_file_size: u64) -> Result<(), BackendError> {
        if self.buckets.contains_key(bucket_id) {
            return Err(BackendError::Conflict(format!("bucket {bucket_id} already exists")));
        }
        self.buckets.insert(bucket_id.to_string(), max_file_size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn seed(backend: &MemoryBackend, names: &[(&str, &str)]) {
        for (name, created) in names {
            backend
                .create_document("items", ID_UNIQUE, json!({ "name": name, "createdAt": created }))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn orders_timestamps_as_instants() {
        let backend = MemoryBackend::new();
        seed(&backend, &[
            ("a", "2024-05-01T10:00:00Z"),
            ("b", "2024-05-01T10:00:00.5Z"),
            ("c", "2024-05-01T09:59:59.999999999Z"),
        ])
        .await;

        let list = backend.list_documents("items", &[Query::order_desc("createdAt")]).await.unwrap();
        let names: Vec<_> = list.documents.iter().map(|d| d["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(list.total, 3);
    }

    #[tokio::test]
    async fn cursor_and_limit_walk_pages() {
        let backend = MemoryBackend::new();
        seed(&backend, &[("a", "2024-01-01T00:00:00Z"), ("b", "2024-01-02T00:00:00Z"), ("c", "2024-01-03T00:00:00Z")]).await;

        let first = backend
            .list_documents("items", &[Query::order_asc("createdAt"), Query::Limit(2)])
            .await
            .unwrap();
        assert_eq!(first.documents.len(), 2);
        let last_id = first.documents[1]["$id"].as_str().unwrap().to_string();

        let second = backend
            .list_documents("items", &[Query::order_asc("createdAt"), Query::Limit(2), Query::CursorAfter(last_id)])
            .await
            .unwrap();
        assert_eq!(second.documents.len(), 1);
        assert_eq!(second.documents[0]["name"], "c");
        assert_eq!(second.total, 3);
    }

    #[tokio::test]
    async fn update_merges_and_delete_reports_missing() {
        let backend = MemoryBackend::new();
        let doc = backend
            .create_document("items", ID_UNIQUE, json!({ "name": "a", "note": "x" }))
            .await
            .unwrap();
        let id = doc["$id"].as_str().unwrap();

        let updated = backend.update_document("items", id, json!({ "note": null })).await.unwrap();
        assert_eq!(updated["name"], "a");
        assert!(updated["note"].is_null());

        backend.delete_document("items", id).await.unwrap();
        assert!(matches!(backend.delete_document("items", id).await, Err(BackendError::NotFound(_))));
        assert_eq!(backend.calls(), 4);
    }

    #[tokio::test]
    async fn sessions_follow_login_and_logout() {
        let backend = MemoryBackend::new();
        backend.create_account(ID_UNIQUE, "Asha@Grocer.in", "s3cret-pass", "Asha").await.unwrap();
        assert!(matches!(backend.get_account().await, Err(BackendError::Unauthorized(_))));
        assert!(backend.create_email_session("asha@grocer.in", "wrong").await.is_err());

        let session = backend.create_email_session("asha@grocer.in", "s3cret-pass").await.unwrap();
        assert_eq!(backend.get_account().await.unwrap().id, session.user_id);
        backend.delete_current_session().await.unwrap();
        assert!(backend.get_account().await.is_err());
    }
}
