use std::sync::Arc;

use configs::AppConfig;
use models::category::{Category, CategoryPatch};
use models::media::AssetUpload;
use models::sub_category::SubCategory;
use service::auth::domain::{AccessLevel, Credentials, RegisterInput};
use service::auth::SessionGate;
use service::backend::MemoryBackend;
use service::pagination::ListOptions;
use service::provision::Provisioner;
use service::{Catalog, ServiceError};

fn config() -> anyhow::Result<AppConfig> {
    let mut cfg = AppConfig::default();
    cfg.apply_env(|key| match key {
        "APPWRITE_ENDPOINT" => Some("https://cloud.example.io/v1".into()),
        "APPWRITE_PROJECT_ID" => Some("grocer".into()),
        "APPWRITE_DATABASE_ID" => Some("main".into()),
        "APPWRITE_CATEGORY_BUCKET_ID" => Some("category-icons".into()),
        _ => None,
    });
    cfg.normalize_and_validate()?;
    Ok(cfg)
}

#[tokio::test]
async fn dairy_category_with_icon_lists_first() -> anyhow::Result<()> {
    let cfg = config()?;
    let backend = Arc::new(MemoryBackend::new());
    let catalog = Catalog::new(backend.clone(), &cfg);

    let older = catalog.categories.create(Category::new("Bakery")).await?;

    let logo = AssetUpload::new("logo.png", "image/png", vec![0u8; 1024 * 1024]);
    let dairy = catalog.categories.create_with_asset(Category::new("Dairy"), logo).await?;

    assert!(!dairy.id.is_empty());
    assert!(dairy.is_active);
    let icon = dairy.icon.clone().expect("icon attached");
    assert_eq!(dairy.icon_url.as_deref(), Some(catalog.categories.asset_url(&icon).as_str()));
    assert!(backend.has_file("category-icons", &icon));

    let listed = catalog.categories.list(&ListOptions::default()).await?;
    let pos = |id: &str| listed.iter().position(|d| d.id == id);
    assert!(pos(&dairy.id).expect("dairy listed") < pos(&older.id).expect("bakery listed"));
    Ok(())
}

#[tokio::test]
async fn admin_manages_catalog_end_to_end() -> anyhow::Result<()> {
    let cfg = config()?;
    let backend = Arc::new(MemoryBackend::new());

    let report = Provisioner::new(backend.clone(), cfg.clone()).run().await;
    assert!(report.is_success());

    let gate = SessionGate::new(backend.clone(), &cfg.backend);
    gate.register_admin(RegisterInput { name: "Ops".into(), email: "ops@grocer.in".into(), password: "Secret123".into() })
        .await?;
    gate.login(Credentials::new("ops@grocer.in", "Secret123")).await?;
    assert!(matches!(gate.guard(AccessLevel::Admin), service::auth::domain::Access::Granted(Some(_))));

    let catalog = Catalog::new(backend.clone(), &cfg);
    let dairy = catalog.categories.create(Category::new("Dairy").with_description("Milk, curd, paneer")).await?;
    let milk = catalog.sub_categories.create(SubCategory::new("Milk", dairy.id.clone())).await?;

    let renamed = catalog
        .categories
        .update(&dairy.id, CategoryPatch { name: Some("Dairy & Eggs".into()), ..Default::default() })
        .await?;
    assert_eq!(renamed.description, dairy.description);
    assert_eq!(renamed.created_at, dairy.created_at);

    catalog.sub_categories.delete(&milk.id).await?;
    assert!(matches!(catalog.sub_categories.get(&milk.id).await, Err(ServiceError::NotFound(_))));
    assert!(catalog.sub_categories_of(&dairy.id).await?.is_empty());

    gate.logout().await?;
    assert_eq!(gate.guard(AccessLevel::Admin).redirect_path(), Some("/admin/login"));
    Ok(())
}
