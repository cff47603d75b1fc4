use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use configs::AppConfig;
use models::brand::Brand;
use models::category::Category;
use models::product::Product;
use models::sub_category::SubCategory;
use models::Document;

use crate::backend::{DocumentStore, ObjectStore};
use crate::errors::ServiceError;
use crate::pagination::ListOptions;
use crate::resource::ResourceService;

/// Record counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub categories: u64,
    pub sub_categories: u64,
    pub brands: u64,
    pub products: u64,
}

/// The four resource services over one shared backend.
pub struct Catalog<S> {
    pub categories: ResourceService<Category, S>,
    pub sub_categories: ResourceService<SubCategory, S>,
    pub brands: ResourceService<Brand, S>,
    pub products: ResourceService<Product, S>,
}

impl<S: DocumentStore + ObjectStore> Catalog<S> {
    pub fn new(backend: Arc<S>, cfg: &AppConfig) -> Self {
        Self {
            categories: ResourceService::new(backend.clone(), cfg),
            sub_categories: ResourceService::new(backend.clone(), cfg),
            brands: ResourceService::new(backend.clone(), cfg),
            products: ResourceService::new(backend, cfg),
        }
    }

    pub async fn sub_categories_of(&self, category_id: &str) -> Result<Vec<Document<SubCategory>>, ServiceError> {
        self.sub_categories
            .list(&ListOptions::default().filter("parentCategoryId", category_id))
            .await
    }

    pub async fn products_in_category(&self, category_id: &str) -> Result<Vec<Document<Product>>, ServiceError> {
        self.products.list(&ListOptions::default().filter("categoryId", category_id)).await
    }

    pub async fn products_of_brand(&self, brand_id: &str) -> Result<Vec<Document<Product>>, ServiceError> {
        self.products.list(&ListOptions::default().filter("brandId", brand_id)).await
    }

    /// Brands whose sponsorship window covers `at`.
    pub async fn sponsored_brands(&self, at: DateTime<Utc>) -> Result<Vec<Document<Brand>>, ServiceError> {
        let sponsored = self.brands.list(&ListOptions::default().filter("isSponsored", true)).await?;
        Ok(sponsored.into_iter().filter(|b| b.is_sponsorship_active(at)).collect())
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<CatalogStats, ServiceError> {
        let all = ListOptions::default();
        let (categories, sub_categories, brands, products) = futures::try_join!(
            self.categories.count(&all),
            self.sub_categories.count(&all),
            self.brands.count(&all),
            self.products.count(&all)
        )?;
        Ok(CatalogStats { categories, sub_categories, brands, products })
    }
}
