use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

/// Two megabytes, the ceiling the admin forms enforce before uploading an image.
pub const DEFAULT_MAX_ASSET_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection details and identifiers for the hosted document/object store.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub database_id: String,
    /// Server API key; required for provisioning, optional for session-based use.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_collection")]
    pub user_collection_id: String,
    #[serde(default)]
    pub resources: ResourcesConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            project_id: String::new(),
            database_id: String::new(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
            user_collection_id: default_user_collection(),
            resources: ResourcesConfig::default(),
        }
    }
}

/// Collection and bucket pair backing one entity kind.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ResourceTarget {
    pub collection_id: String,
    pub bucket_id: String,
}

impl ResourceTarget {
    fn new(collection_id: &str, bucket_id: &str) -> Self {
        Self { collection_id: collection_id.to_string(), bucket_id: bucket_id.to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default = "default_categories")]
    pub categories: ResourceTarget,
    #[serde(default = "default_sub_categories")]
    pub sub_categories: ResourceTarget,
    #[serde(default = "default_brands")]
    pub brands: ResourceTarget,
    #[serde(default = "default_products")]
    pub products: ResourceTarget,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            sub_categories: default_sub_categories(),
            brands: default_brands(),
            products: default_products(),
        }
    }
}

impl ResourcesConfig {
    /// All targets with a label, in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ResourceTarget)> {
        [
            ("categories", &self.categories),
            ("sub_categories", &self.sub_categories),
            ("brands", &self.brands),
            ("products", &self.products),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_asset_bytes")]
    pub max_asset_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { max_asset_bytes: DEFAULT_MAX_ASSET_BYTES }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

fn default_request_timeout() -> u64 { 30 }
fn default_user_collection() -> String { "users".into() }
fn default_max_asset_bytes() -> u64 { DEFAULT_MAX_ASSET_BYTES }
fn default_categories() -> ResourceTarget { ResourceTarget::new("categories", "categories") }
fn default_sub_categories() -> ResourceTarget { ResourceTarget::new("sub_categories", "sub_categories") }
fn default_brands() -> ResourceTarget { ResourceTarget::new("brands", "brands") }
fn default_products() -> ResourceTarget { ResourceTarget::new("products", "products") }

/// Load from `CONFIG_PATH` (default `config.toml`); a missing file yields defaults.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if !std::path::Path::new(&path).exists() {
        return Ok(AppConfig::default());
    }
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// File (if any), then process environment, then validation.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Overlay values from an environment lookup. Unset or blank keys leave
    /// the current value alone.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let b = &mut self.backend;
        let r = &mut b.resources;
        let ids: [(&str, &mut String); 12] = [
            ("APPWRITE_ENDPOINT", &mut b.endpoint),
            ("APPWRITE_PROJECT_ID", &mut b.project_id),
            ("APPWRITE_DATABASE_ID", &mut b.database_id),
            ("APPWRITE_USER_COLLECTION_ID", &mut b.user_collection_id),
            ("APPWRITE_CATEGORY_COLLECTION_ID", &mut r.categories.collection_id),
            ("APPWRITE_CATEGORY_BUCKET_ID", &mut r.categories.bucket_id),
            ("APPWRITE_SUBCATEGORY_COLLECTION_ID", &mut r.sub_categories.collection_id),
            ("APPWRITE_SUBCATEGORY_BUCKET_ID", &mut r.sub_categories.bucket_id),
            ("APPWRITE_BRAND_COLLECTION_ID", &mut r.brands.collection_id),
            ("APPWRITE_BRAND_BUCKET_ID", &mut r.brands.bucket_id),
            ("APPWRITE_PRODUCT_COLLECTION_ID", &mut r.products.collection_id),
            // the product image bucket is the project's default bucket
            ("APPWRITE_BUCKET_ID", &mut r.products.bucket_id),
        ];
        for (key, slot) in ids {
            if let Some(v) = get(key) {
                *slot = v;
            }
        }

        if let Some(v) = get("APPWRITE_API_KEY") {
            b.api_key = Some(v);
        }
        if let Some(v) = get("APPWRITE_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            b.request_timeout_secs = v;
        }
        if let Some(v) = get("MAX_ASSET_BYTES").and_then(|v| v.parse().ok()) {
            self.uploads.max_asset_bytes = v;
        }
        if let Some(v) = get("LOG_FORMAT") {
            self.logging.json = v.eq_ignore_ascii_case("json");
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.backend.normalize();
        self.backend.validate()?;
        if self.uploads.max_asset_bytes == 0 {
            return Err(anyhow!("uploads.max_asset_bytes must be > 0"));
        }
        Ok(())
    }
}

impl BackendConfig {
    pub fn normalize(&mut self) {
        let trimmed = self.endpoint.trim().trim_end_matches('/').to_string();
        self.endpoint = trimmed;
        if self.api_key.as_deref().map(str::trim) == Some("") {
            self.api_key = None;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(anyhow!("backend.endpoint is empty; set it in config.toml or APPWRITE_ENDPOINT"));
        }
        let lower = self.endpoint.to_lowercase();
        if !(lower.starts_with("https://") || lower.starts_with("http://")) {
            return Err(anyhow!("backend.endpoint must start with http:// or https://"));
        }
        if self.project_id.trim().is_empty() {
            return Err(anyhow!("backend.project_id is empty; set APPWRITE_PROJECT_ID"));
        }
        if self.database_id.trim().is_empty() {
            return Err(anyhow!("backend.database_id is empty; set APPWRITE_DATABASE_ID"));
        }
        if self.user_collection_id.trim().is_empty() {
            return Err(anyhow!("backend.user_collection_id is empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("backend.request_timeout_secs must be a positive number of seconds"));
        }
        for (label, target) in self.resources.iter() {
            if target.collection_id.trim().is_empty() || target.bucket_id.trim().is_empty() {
                return Err(anyhow!("backend.resources.{label} needs both collection_id and bucket_id"));
            }
        }
        Ok(())
    }
}
