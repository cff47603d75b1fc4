//! Generic CRUD and media service, instantiated once per entity kind.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, Stream, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use configs::{AppConfig, ResourceTarget, ResourcesConfig};
use models::media::AssetUpload;
use models::{Document, MediaRef, Reference, Resource, ResourceKind, ResourcePatch};

use crate::assets::AssetLocator;
use crate::backend::{BackendError, DocumentStore, FileUpload, ObjectStore, ID_UNIQUE};
use crate::errors::ServiceError;
use crate::pagination::{ListOptions, Page, PageToken};

/// Collection and bucket configured for `kind`.
pub fn target_for(resources: &ResourcesConfig, kind: ResourceKind) -> &ResourceTarget {
    match kind {
        ResourceKind::Category => &resources.categories,
        ResourceKind::SubCategory => &resources.sub_categories,
        ResourceKind::Brand => &resources.brands,
        ResourceKind::Product => &resources.products,
    }
}

fn to_payload<P: Serialize>(value: &P) -> Result<Value, ServiceError> {
    serde_json::to_value(value).map_err(|e| ServiceError::Validation(format!("unserializable payload: {e}")))
}

/// CRUD plus upload/derive-URL/delete for one entity kind.
///
/// Holds no mutable state; share it behind an `Arc`.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use configs::AppConfig;
/// use models::category::Category;
/// use service::backend::MemoryBackend;
/// use service::resource::ResourceService;
///
/// let mut cfg = AppConfig::default();
/// cfg.backend.endpoint = "https://cloud.example.io/v1".into();
/// cfg.backend.project_id = "grocer".into();
/// let categories: ResourceService<Category, _> = ResourceService::new(Arc::new(MemoryBackend::new()), &cfg);
/// let dairy = tokio_test::block_on(categories.create(Category::new("Dairy"))).unwrap();
/// let fetched = tokio_test::block_on(categories.get(&dairy.id)).unwrap();
/// assert_eq!(fetched, dairy);
/// ```
pub struct ResourceService<T: Resource, S> {
    backend: Arc<S>,
    collection_id: String,
    locator: AssetLocator,
    max_asset_bytes: u64,
    collections: HashMap<ResourceKind, String>,
    _kind: PhantomData<fn() -> T>,
}

impl<T, S> ResourceService<T, S>
where
    T: Resource,
    S: DocumentStore + ObjectStore,
{
    pub fn new(backend: Arc<S>, cfg: &AppConfig) -> Self {
        let resources = &cfg.backend.resources;
        let target = target_for(resources, T::KIND);
        let collections = ResourceKind::ALL
            .iter()
            .map(|kind| (*kind, target_for(resources, *kind).collection_id.clone()))
            .collect();
        Self {
            backend,
            collection_id: target.collection_id.clone(),
            locator: AssetLocator::new(&cfg.backend.endpoint, &cfg.backend.project_id, &target.bucket_id),
            max_asset_bytes: cfg.uploads.max_asset_bytes,
            collections,
            _kind: PhantomData,
        }
    }

    pub fn collection_id(&self) -> &str { &self.collection_id }

    pub fn bucket_id(&self) -> &str { self.locator.bucket_id() }

    fn decode(&self, raw: Value) -> Result<Document<T>, ServiceError> {
        serde_json::from_value(raw).map_err(|e| ServiceError::RemoteRead(format!("malformed {} document: {e}", T::KIND)))
    }

    async fn check_references(&self, references: &[Reference]) -> Result<(), ServiceError> {
        for reference in references {
            let collection = self
                .collections
                .get(&reference.kind)
                .ok_or_else(|| ServiceError::Validation(format!("no collection configured for {}", reference.kind)))?;
            match self.backend.get_document(collection, &reference.id).await {
                Ok(_) => {}
                Err(BackendError::NotFound(_)) => {
                    return Err(ServiceError::Validation(format!(
                        "{} references missing {} {}",
                        reference.field, reference.kind, reference.id
                    )));
                }
                Err(e) => return Err(ServiceError::read(e)),
            }
        }
        Ok(())
    }

    /// Validate, check referenced ids exist, then store. The backend assigns the id.
    #[instrument(skip(self, data), fields(kind = %T::KIND))]
    pub async fn create(&self, mut data: T) -> Result<Document<T>, ServiceError> {
        data.normalize();
        data.validate()?;
        self.check_references(&data.references()).await?;

        let raw = self
            .backend
            .create_document(&self.collection_id, ID_UNIQUE, to_payload(&data)?)
            .await
            .map_err(ServiceError::write)?;
        let doc = self.decode(raw)?;
        info!(kind = %T::KIND, id = %doc.id, name = %doc.display_name(), "resource_created");
        Ok(doc)
    }

    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn get(&self, id: &str) -> Result<Document<T>, ServiceError> {
        let raw = self.backend.get_document(&self.collection_id, id).await.map_err(ServiceError::read)?;
        self.decode(raw)
    }

    /// One page of results, starting after `after` when given.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn list_page(&self, opts: &ListOptions, after: Option<&PageToken>) -> Result<Page<T>, ServiceError> {
        let list = self
            .backend
            .list_documents(&self.collection_id, &opts.to_queries(after))
            .await
            .map_err(ServiceError::read)?;
        let items = list.documents.into_iter().map(|raw| self.decode(raw)).collect::<Result<Vec<_>, _>>()?;
        debug!(kind = %T::KIND, count = items.len(), total = list.total, "page_listed");
        Ok(Page::from_items(items, list.total, opts.normalized_page_size()))
    }

    /// Every matching record, walking all pages.
    pub async fn list(&self, opts: &ListOptions) -> Result<Vec<Document<T>>, ServiceError> {
        self.stream(opts.clone()).try_collect().await
    }

    /// Number of matching records.
    pub async fn count(&self, opts: &ListOptions) -> Result<u64, ServiceError> {
        let probe = opts.clone().page_size(1);
        Ok(self.list_page(&probe, None).await?.total)
    }

    /// Lazily walks pages; finishes after the first short page.
    pub fn stream(&self, opts: ListOptions) -> impl Stream<Item = Result<Document<T>, ServiceError>> + '_ {
        self.stream_from(opts, None)
    }

    /// Like [`stream`](Self::stream), resuming after `start`.
    pub fn stream_from(
        &self,
        opts: ListOptions,
        start: Option<PageToken>,
    ) -> impl Stream<Item = Result<Document<T>, ServiceError>> + '_ {
        stream::try_unfold(Some(start), move |state| {
            let opts = opts.clone();
            async move {
                let Some(cursor) = state else { return Ok::<_, ServiceError>(None) };
                let page = self.list_page(&opts, cursor.as_ref()).await?;
                let next_state = page.next.clone().map(Some);
                let items = stream::iter(page.items.into_iter().map(Ok::<_, ServiceError>));
                Ok::<_, ServiceError>(Some((items, next_state)))
            }
        })
        .try_flatten()
    }

    /// Apply `patch` to a copy of the stored record and validate the result.
    async fn check_patch(&self, current: &Document<T>, patch: &T::Patch) -> Result<(), ServiceError> {
        let mut merged = current.data.clone();
        patch.apply_to(&mut merged);
        merged.validate()?;
        self.check_references(&patch.references()).await
    }

    async fn write_patch(&self, id: &str, patch: &T::Patch) -> Result<Document<T>, ServiceError> {
        let raw = self
            .backend
            .update_document(&self.collection_id, id, to_payload(patch)?)
            .await
            .map_err(ServiceError::write)?;
        let doc = self.decode(raw)?;
        info!(kind = %T::KIND, id = %doc.id, "resource_updated");
        Ok(doc)
    }

    /// Write only the fields present in `patch`, after checking the record it
    /// would produce. An empty patch returns the current record untouched.
    #[instrument(skip(self, patch), fields(kind = %T::KIND))]
    pub async fn update(&self, id: &str, mut patch: T::Patch) -> Result<Document<T>, ServiceError> {
        patch.normalize();
        let current = self.get(id).await?;
        if patch.is_empty() {
            return Ok(current);
        }
        self.check_patch(&current, &patch).await?;
        self.write_patch(id, &patch).await
    }

    /// Hard delete. Media files are left in place.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        self.backend.delete_document(&self.collection_id, id).await.map_err(ServiceError::write)?;
        info!(kind = %T::KIND, id = %id, "resource_deleted");
        Ok(())
    }

    /// Type and size are checked before the backend is contacted.
    #[instrument(skip(self, upload), fields(kind = %T::KIND, file = %upload.file_name, size = upload.size()))]
    pub async fn upload_asset(&self, upload: AssetUpload, entity_name: Option<&str>) -> Result<String, ServiceError> {
        upload.check(self.max_asset_bytes)?;
        let file_name = upload.stored_name(entity_name, Utc::now().timestamp());
        let file = FileUpload { file_name, content_type: upload.content_type, bytes: upload.bytes };
        let stored = self
            .backend
            .create_file(self.locator.bucket_id(), ID_UNIQUE, file)
            .await
            .map_err(ServiceError::write)?;
        info!(kind = %T::KIND, asset_id = %stored.id, name = %stored.name, "asset_uploaded");
        Ok(stored.id)
    }

    pub fn asset_url(&self, asset_id: &str) -> String { self.locator.url(asset_id) }

    pub fn media(&self, asset_id: &str) -> MediaRef {
        MediaRef { asset_id: asset_id.to_string(), url: self.asset_url(asset_id) }
    }

    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn delete_asset(&self, asset_id: &str) -> Result<(), ServiceError> {
        self.backend
            .delete_file(self.locator.bucket_id(), asset_id)
            .await
            .map_err(ServiceError::write)?;
        info!(kind = %T::KIND, asset_id = %asset_id, "asset_deleted");
        Ok(())
    }

    async fn discard_asset(&self, asset_id: &str) {
        if let Err(err) = self.delete_asset(asset_id).await {
            warn!(kind = %T::KIND, asset_id = %asset_id, error = %err, "asset_cleanup_failed");
        }
    }

    /// Delete `old` (a failure is only logged), then upload the new file.
    pub async fn replace_asset(
        &self,
        upload: AssetUpload,
        entity_name: Option<&str>,
        old: Option<&str>,
    ) -> Result<MediaRef, ServiceError> {
        upload.check(self.max_asset_bytes)?;
        if let Some(old) = old {
            self.discard_asset(old).await;
        }
        let asset_id = self.upload_asset(upload, entity_name).await?;
        Ok(self.media(&asset_id))
    }

    /// Upload, attach and create. If the create fails the uploaded file is
    /// deleted again and the create error is returned.
    #[instrument(skip(self, data, upload), fields(kind = %T::KIND))]
    pub async fn create_with_asset(&self, mut data: T, upload: AssetUpload) -> Result<Document<T>, ServiceError> {
        data.normalize();
        data.validate()?;
        let asset_id = self.upload_asset(upload, Some(data.display_name())).await?;
        data.attach_media(self.media(&asset_id));

        match self.create(data).await {
            Ok(doc) => Ok(doc),
            Err(err) => {
                self.discard_asset(&asset_id).await;
                Err(err)
            }
        }
    }

    /// Upload a new file and point the record at it together with `patch`.
    /// The previous file is removed after a successful update; on failure the
    /// new file is removed and the record keeps its old media.
    #[instrument(skip(self, patch, upload), fields(kind = %T::KIND))]
    pub async fn update_with_asset(
        &self,
        id: &str,
        mut patch: T::Patch,
        upload: AssetUpload,
    ) -> Result<Document<T>, ServiceError> {
        patch.normalize();
        upload.check(self.max_asset_bytes)?;
        let current = self.get(id).await?;
        self.check_patch(&current, &patch).await?;
        let previous = current.media_assets();
        let name = patch.display_name().unwrap_or(current.display_name()).to_string();

        let asset_id = self.upload_asset(upload, Some(&name)).await?;
        patch.set_media(Some(self.media(&asset_id)));

        match self.write_patch(id, &patch).await {
            Ok(doc) => {
                for old in previous.iter().filter(|old| **old != asset_id) {
                    self.discard_asset(old).await;
                }
                Ok(doc)
            }
            Err(err) => {
                self.discard_asset(&asset_id).await;
                Err(err)
            }
        }
    }

    /// Clear the media fields, then remove the stored files.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn detach_asset(&self, id: &str) -> Result<Document<T>, ServiceError> {
        let current = self.get(id).await?;
        let assets = current.media_assets();
        if assets.is_empty() {
            return Ok(current);
        }

        let mut patch = T::Patch::default();
        patch.set_media(None);
        let doc = self.write_patch(id, &patch).await?;
        for asset in &assets {
            self.discard_asset(asset).await;
        }
        Ok(doc)
    }

    /// Remove every media file of the record, then the record itself. Files
    /// that are already gone are skipped.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn delete_with_assets(&self, id: &str) -> Result<(), ServiceError> {
        let current = self.get(id).await?;
        for asset in current.media_assets() {
            match self.delete_asset(&asset).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => debug!(asset_id = %asset, "asset_already_gone"),
                Err(err) => return Err(err),
            }
        }
        self.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use futures::StreamExt;
    use models::brand::{Brand, BrandPatch, SponsorshipType};
    use models::category::{Category, CategoryPatch};
    use models::product::{Product, ProductPatch, ProductType};
    use models::sub_category::{SubCategory, SubCategoryPatch};

    use crate::backend::MemoryBackend;

    const MB: usize = 1024 * 1024;

    fn config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.backend.endpoint = "https://cloud.example.io/v1".into();
        cfg.backend.project_id = "grocer".into();
        cfg.backend.database_id = "main".into();
        let r = &mut cfg.backend.resources;
        r.categories.bucket_id = "category-icons".into();
        r.sub_categories.bucket_id = "sub-category-images".into();
        r.brands.bucket_id = "brand-icons".into();
        r.products.bucket_id = "product-images".into();
        cfg
    }

    fn services() -> (Arc<MemoryBackend>, ResourceService<Category, MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let svc = ResourceService::new(backend.clone(), &config());
        (backend, svc)
    }

    fn png(bytes: usize) -> AssetUpload { AssetUpload::new("icon.png", "image/png", vec![7; bytes]) }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (_, categories) = services();
        let created = categories.create(Category::new("Dairy").with_description("Milk and more")).await.unwrap();
        assert!(!created.id.is_empty());
        assert_eq!(created.name, "Dairy");

        let fetched = categories.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn blank_name_is_rejected_without_a_write() {
        let (backend, categories) = services();
        let err = categories.create(Category::new("   ")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Model(_)));
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let (_, categories) = services();
        let created = categories.create(Category::new("Bakery")).await.unwrap();
        categories.delete(&created.id).await.unwrap();

        assert!(categories.get(&created.id).await.unwrap_err().is_not_found());
        assert!(categories.delete(&created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_changes_only_the_named_field() {
        let (_, categories) = services();
        let created = categories.create(Category::new("Dairy").with_description("Milk")).await.unwrap();

        let patch = CategoryPatch { name: Some("Dairy & Eggs".into()), ..Default::default() };
        let updated = categories.update(&created.id, patch).await.unwrap();

        let mut expected = created.clone();
        expected.name = "Dairy & Eggs".into();
        assert_eq!(updated, expected);
    }

    #[tokio::test]
    async fn empty_patch_returns_current_record() {
        let (_, categories) = services();
        let created = categories.create(Category::new("Dairy")).await.unwrap();
        assert_eq!(categories.update(&created.id, CategoryPatch::default()).await.unwrap(), created);
        assert!(categories.update("missing", CategoryPatch::default()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn update_trims_and_checks_the_patched_name() {
        let (backend, categories) = services();
        let created = categories.create(Category::new("Dairy")).await.unwrap();

        let spaced = CategoryPatch { name: Some("  Spaced  ".into()), ..Default::default() };
        assert_eq!(categories.update(&created.id, spaced).await.unwrap().name, "Spaced");

        let calls = backend.calls();
        let blank = CategoryPatch { name: Some("   ".into()), ..Default::default() };
        assert!(matches!(categories.update(&created.id, blank).await, Err(ServiceError::Model(_))));
        assert_eq!(backend.calls(), calls + 1, "only the read of the stored record");
        assert_eq!(categories.get(&created.id).await.unwrap().name, "Spaced");
    }

    #[tokio::test]
    async fn rejected_uploads_never_reach_the_backend() {
        let (backend, categories) = services();

        let gif = AssetUpload::new("icon.gif", "image/gif", vec![1; 10]);
        assert!(matches!(categories.upload_asset(gif, None).await, Err(ServiceError::InvalidAssetType(t)) if t == "image/gif"));

        let big = png(3 * MB);
        match categories.upload_asset(big, Some("Dairy")).await {
            Err(ServiceError::AssetTooLarge { size, limit }) => {
                assert_eq!(size, 3 * MB as u64);
                assert_eq!(limit, 2 * MB as u64);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn upload_names_file_after_entity() {
        let (backend, categories) = services();
        let id = categories.upload_asset(png(10), Some("Fresh Fruit")).await.unwrap();
        let stored = backend.stored_file("category-icons", &id).unwrap();
        assert!(stored.name.starts_with("fresh-fruit-"));
        assert!(stored.name.ends_with(".png"));
        assert_eq!(
            categories.asset_url(&id),
            format!("https://cloud.example.io/v1/storage/buckets/category-icons/files/{id}/view?project=grocer")
        );
    }

    #[tokio::test]
    async fn stored_extension_matches_declared_type() {
        let (backend, categories) = services();
        let renamed = AssetUpload::new("logo.webp", "image/png", vec![1; 10]);
        let id = categories.upload_asset(renamed, Some("Dairy")).await.unwrap();
        let stored = backend.stored_file("category-icons", &id).unwrap();
        assert!(stored.name.starts_with("dairy-"));
        assert!(stored.name.ends_with(".png"), "{}", stored.name);
    }

    #[tokio::test]
    async fn create_with_asset_removes_upload_when_create_fails() {
        let (backend, categories) = services();
        backend.reject_writes(categories.collection_id());

        let err = categories.create_with_asset(Category::new("Dairy"), png(10)).await.unwrap_err();
        assert!(matches!(err, ServiceError::RemoteWrite(_)));
        assert_eq!(backend.file_count("category-icons"), 0);

        backend.accept_writes(categories.collection_id());
        let doc = categories.create_with_asset(Category::new("Dairy"), png(10)).await.unwrap();
        let icon = doc.icon.clone().unwrap();
        assert!(backend.has_file("category-icons", &icon));
        assert_eq!(doc.icon_url.as_deref(), Some(categories.asset_url(&icon).as_str()));
    }

    #[tokio::test]
    async fn update_with_asset_swaps_files() {
        let (backend, categories) = services();
        let doc = categories.create_with_asset(Category::new("Dairy"), png(10)).await.unwrap();
        let old_icon = doc.icon.clone().unwrap();

        let updated = categories.update_with_asset(&doc.id, CategoryPatch::default().touched(), png(20)).await.unwrap();
        let new_icon = updated.icon.clone().unwrap();
        assert_ne!(new_icon, old_icon);
        assert!(updated.updated_at.is_some());
        assert!(!backend.has_file("category-icons", &old_icon));
        assert!(backend.has_file("category-icons", &new_icon));

        backend.reject_writes(categories.collection_id());
        let err = categories.update_with_asset(&doc.id, CategoryPatch::default(), png(30)).await;
        assert!(err.is_err());
        assert_eq!(backend.file_count("category-icons"), 1);
        assert!(backend.has_file("category-icons", &new_icon));
    }

    #[tokio::test]
    async fn detach_and_delete_with_assets_clean_up_files() {
        let (backend, categories) = services();
        let doc = categories.create_with_asset(Category::new("Dairy"), png(10)).await.unwrap();
        let detached = categories.detach_asset(&doc.id).await.unwrap();
        assert!(detached.icon.is_none());
        assert!(detached.icon_url.is_none());
        assert_eq!(backend.file_count("category-icons"), 0);

        let doc = categories.create_with_asset(Category::new("Snacks"), png(10)).await.unwrap();
        let icon = doc.icon.clone().unwrap();
        backend.delete_file("category-icons", &icon).await.unwrap();
        categories.delete_with_assets(&doc.id).await.unwrap();
        assert!(categories.get(&doc.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn replace_asset_tolerates_missing_old_file() {
        let (backend, categories) = services();
        let media = categories.replace_asset(png(10), Some("Dairy"), Some("gone")).await.unwrap();
        assert!(backend.has_file("category-icons", &media.asset_id));
        assert_eq!(media.url, categories.asset_url(&media.asset_id));
    }

    #[tokio::test]
    async fn sub_category_parent_must_exist() {
        let backend = Arc::new(MemoryBackend::new());
        let cfg = config();
        let categories: ResourceService<Category, _> = ResourceService::new(backend.clone(), &cfg);
        let subs: ResourceService<SubCategory, _> = ResourceService::new(backend.clone(), &cfg);

        let err = subs.create(SubCategory::new("Milk", "nope")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(msg) if msg.contains("parentCategoryId")));
        assert_eq!(backend.document_count(subs.collection_id()).await, 0);

        let dairy = categories.create(Category::new("Dairy")).await.unwrap();
        let milk = subs.create(SubCategory::new("Milk", dairy.id.clone())).await.unwrap();
        assert_eq!(milk.parent_category_id, dairy.id);
    }

    #[tokio::test]
    async fn sub_category_update_is_checked_against_the_stored_record() {
        let backend = Arc::new(MemoryBackend::new());
        let cfg = config();
        let categories: ResourceService<Category, _> = ResourceService::new(backend.clone(), &cfg);
        let subs: ResourceService<SubCategory, _> = ResourceService::new(backend.clone(), &cfg);
        let dairy = categories.create(Category::new("Dairy")).await.unwrap();
        let milk = subs.create(SubCategory::new("Milk", dairy.id.clone())).await.unwrap();

        let blank_parent = SubCategoryPatch { parent_category_id: Some("  ".into()), ..Default::default() };
        assert!(matches!(subs.update(&milk.id, blank_parent).await, Err(ServiceError::Model(_))));
        let moved = SubCategoryPatch { parent_category_id: Some("nope".into()), ..Default::default() };
        assert!(matches!(subs.update(&milk.id, moved).await, Err(ServiceError::Validation(_))));

        let renamed = SubCategoryPatch { name: Some(" Toned Milk ".into()), ..Default::default() };
        let updated = subs.update(&milk.id, renamed).await.unwrap();
        assert_eq!(updated.name, "Toned Milk");
        assert_eq!(updated.parent_category_id, dairy.id);
    }

    #[tokio::test]
    async fn brand_update_keeps_the_sponsorship_window_ordered() {
        let backend = Arc::new(MemoryBackend::new());
        let brands: ResourceService<Brand, _> = ResourceService::new(backend.clone(), &config());
        let now = Utc::now();
        let amul = Brand::new("Amul").sponsored(SponsorshipType::Featured, Some(now), None);
        let amul = brands.create(amul).await.unwrap();

        let backwards = BrandPatch { sponsorship_end_date: Some(Some(now - Duration::days(5))), ..Default::default() };
        assert!(matches!(brands.update(&amul.id, backwards).await, Err(ServiceError::Model(_))));
        let stored = brands.get(&amul.id).await.unwrap();
        assert!(stored.sponsorship_end_date.is_none());
        assert!(stored.validate().is_ok());

        let off = BrandPatch { is_sponsored: Some(false), ..Default::default() };
        let ended = brands.update(&amul.id, off).await.unwrap();
        assert_eq!(ended.sponsorship_type, SponsorshipType::None);
        assert!(ended.sponsorship_start_date.is_none());
    }

    #[tokio::test]
    async fn product_update_is_judged_with_stored_fields() {
        let backend = Arc::new(MemoryBackend::new());
        let cfg = config();
        let categories: ResourceService<Category, _> = ResourceService::new(backend.clone(), &cfg);
        let products: ResourceService<Product, _> = ResourceService::new(backend.clone(), &cfg);
        let dairy = categories.create(Category::new("Dairy")).await.unwrap();
        let milk = Product::new("Toned Milk", dairy.id.clone(), ProductType::Food, 60.0, 58.0)
            .with_fssai_license("10012345000123");
        let milk = products.create(milk).await.unwrap();

        let flag_only = ProductPatch { is_food_item: Some(true), ..Default::default() };
        assert!(products.update(&milk.id, flag_only).await.is_ok());

        let broken =
            ProductPatch { fssai_license: Some(None), max_order_quantity: Some(Some(0)), ..Default::default() };
        assert!(matches!(products.update(&milk.id, broken).await, Err(ServiceError::Model(_))));
        let stored = products.get(&milk.id).await.unwrap();
        assert_eq!(stored.fssai_license.as_deref(), Some("10012345000123"));
        assert!(stored.validate().is_ok());

        let calls = backend.calls();
        let upload = AssetUpload::new("milk.png", "image/png", vec![1; 16]);
        let bad = ProductPatch { selling_price: Some(-1.0), ..Default::default() };
        assert!(products.update_with_asset(&milk.id, bad, upload).await.is_err());
        assert_eq!(backend.file_count("product-images"), 0);
        assert_eq!(backend.calls(), calls + 1);
    }

    #[tokio::test]
    async fn product_references_category_and_brand() {
        let backend = Arc::new(MemoryBackend::new());
        let cfg = config();
        let categories: ResourceService<Category, _> = ResourceService::new(backend.clone(), &cfg);
        let brands: ResourceService<Brand, _> = ResourceService::new(backend.clone(), &cfg);
        let products: ResourceService<Product, _> = ResourceService::new(backend.clone(), &cfg);

        let staples = categories.create(Category::new("Staples")).await.unwrap();
        let product = Product::new("Basmati Rice", staples.id.clone(), ProductType::Grocery, 120.0, 110.0).with_brand("ghost");
        assert!(matches!(products.create(product.clone()).await, Err(ServiceError::Validation(_))));

        let brand = brands.create(Brand::new("India Gate")).await.unwrap();
        let product = products.create(product.with_brand(brand.id.clone())).await.unwrap();
        assert_eq!(product.brand_id.as_deref(), Some(brand.id.as_str()));

        let with_image = products
            .update_with_asset(&product.id, Default::default(), AssetUpload::new("rice.jpg", "image/jpeg", vec![1; 64]))
            .await
            .unwrap();
        assert_eq!(with_image.images.len(), 1);
        assert_eq!(with_image.image_urls[0], products.asset_url(&with_image.images[0]));
    }

    #[tokio::test]
    async fn listing_is_newest_first_across_pages() {
        let (_, categories) = services();
        let mut ids = Vec::new();
        for name in ["A", "B", "C", "D", "E"] {
            ids.push(categories.create(Category::new(name)).await.unwrap().id);
        }
        ids.reverse();

        let opts = ListOptions::default().page_size(2);
        let all: Vec<_> = categories.list(&opts).await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(all, ids);

        let first = categories.list_page(&opts, None).await.unwrap();
        assert_eq!(first.total, 5);
        let token = first.next.clone().unwrap();
        let rest: Vec<_> = categories
            .stream_from(opts.clone(), Some(token))
            .map(|d| d.unwrap().id)
            .collect()
            .await;
        assert_eq!(rest, ids[2..].to_vec());
        assert_eq!(categories.count(&ListOptions::default()).await.unwrap(), 5);
    }
}
