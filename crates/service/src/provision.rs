//! Creates the collections, attributes, indexes and buckets the services
//! expect. Objects that already exist are left alone, and a failed step is
//! recorded without stopping the run.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument};

use configs::AppConfig;
use models::brand::Brand;
use models::category::Category;
use models::product::Product;
use models::profile::UserProfile;
use models::schema::{AttributeSpec, IndexSpec};
use models::sub_category::SubCategory;
use models::{Resource, ResourceKind};

use crate::backend::{BackendError, SchemaApi};
use crate::resource::target_for;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Created,
    Existing,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionStep {
    pub target: String,
    pub outcome: StepOutcome,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProvisionReport {
    pub steps: Vec<ProvisionStep>,
}

impl ProvisionReport {
    fn count(&self, outcome: StepOutcome) -> usize { self.steps.iter().filter(|s| s.outcome == outcome).count() }

    pub fn created(&self) -> usize { self.count(StepOutcome::Created) }

    pub fn existing(&self) -> usize { self.count(StepOutcome::Existing) }

    pub fn failed(&self) -> usize { self.count(StepOutcome::Failed) }

    pub fn is_success(&self) -> bool { self.failed() == 0 }

    fn record(&mut self, target: String, result: Result<(), BackendError>) -> StepOutcome {
        let (outcome, message) = match result {
            Ok(()) => (StepOutcome::Created, None),
            Err(BackendError::Conflict(_)) => (StepOutcome::Existing, None),
            Err(e) => (StepOutcome::Failed, Some(e.to_string())),
        };
        match &message {
            Some(msg) => error!(step = %target, error = %msg, "provision_step_failed"),
            None => info!(step = %target, outcome = ?outcome, "provision_step"),
        }
        self.steps.push(ProvisionStep { target, outcome, message });
        outcome
    }
}

/// Declared attribute and index layout of each entity kind.
pub fn layout_for(kind: ResourceKind) -> (&'static [AttributeSpec], &'static [IndexSpec]) {
    match kind {
        ResourceKind::Category => (Category::schema(), Category::indexes()),
        ResourceKind::SubCategory => (SubCategory::schema(), SubCategory::indexes()),
        ResourceKind::Brand => (Brand::schema(), Brand::indexes()),
        ResourceKind::Product => (Product::schema(), Product::indexes()),
    }
}

pub struct Provisioner<B> {
    backend: Arc<B>,
    cfg: AppConfig,
    /// Pause between attribute and index creation; the hosted backend builds
    /// attributes asynchronously.
    attribute_settle: Duration,
}

impl<B: SchemaApi> Provisioner<B> {
    pub fn new(backend: Arc<B>, cfg: AppConfig) -> Self {
        Self { backend, cfg, attribute_settle: Duration::ZERO }
    }

    pub fn with_attribute_settle(mut self, settle: Duration) -> Self {
        self.attribute_settle = settle;
        self
    }

    async fn collection(
        &self,
        report: &mut ProvisionReport,
        collection_id: &str,
        attributes: &[AttributeSpec],
        indexes: &[IndexSpec],
    ) {
        let created = self.backend.create_collection(collection_id, collection_id).await;
        if report.record(format!("collection {collection_id}"), created) == StepOutcome::Failed {
            return;
        }
        for spec in attributes {
            let result = self.backend.create_attribute(collection_id, spec).await;
            report.record(format!("attribute {collection_id}.{}", spec.key), result);
        }
        if !self.attribute_settle.is_zero() {
            tokio::time::sleep(self.attribute_settle).await;
        }
        for spec in indexes {
            let result = self.backend.create_index(collection_id, spec).await;
            report.record(format!("index {collection_id}.{}", spec.key), result);
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> ProvisionReport {
        let mut report = ProvisionReport::default();
        let resources = &self.cfg.backend.resources;

        for kind in ResourceKind::ALL {
            let (attributes, indexes) = layout_for(kind);
            let collection_id = target_for(resources, kind).collection_id.clone();
            self.collection(&mut report, &collection_id, attributes, indexes).await;
        }
        let users = self.cfg.backend.user_collection_id.clone();
        self.collection(&mut report, &users, UserProfile::schema(), UserProfile::indexes()).await;

        let buckets: BTreeSet<&str> = ResourceKind::ALL
            .iter()
            .map(|kind| target_for(resources, *kind).bucket_id.as_str())
            .collect();
        for bucket in buckets {
            let result = self.backend.create_bucket(bucket, bucket, self.cfg.uploads.max_asset_bytes).await;
            report.record(format!("bucket {bucket}"), result);
        }

        info!(
            created = report.created(),
            existing = report.existing(),
            failed = report.failed(),
            "provision_finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[tokio::test]
    async fn second_run_finds_everything_in_place() {
        let backend = Arc::new(MemoryBackend::new());
        let mut cfg = AppConfig::default();
        cfg.backend.resources.products.bucket_id = "categories".into();
        let provisioner = Provisioner::new(backend.clone(), cfg);

        let first = provisioner.run().await;
        assert!(first.is_success(), "{:?}", first.steps);
        assert_eq!(first.existing(), 0);
        assert!(backend.attribute_keys("products").contains(&"variations".to_string()));
        assert!(backend.index_keys("sub_categories").contains(&"idx_parent".to_string()));
        assert!(backend.has_bucket("brands"));
        assert_eq!(first.steps.iter().filter(|s| s.target.starts_with("bucket")).count(), 3);

        let second = provisioner.run().await;
        assert_eq!(second.created(), 0);
        assert_eq!(second.existing(), first.created());
    }

    #[test]
    fn every_index_names_a_declared_attribute() {
        for kind in ResourceKind::ALL {
            let (attributes, indexes) = layout_for(kind);
            for index in indexes {
                for attr in index.attributes {
                    assert!(attributes.iter().any(|a| a.key == *attr), "{kind}: {} uses {attr}", index.key);
                }
            }
        }
    }
}
