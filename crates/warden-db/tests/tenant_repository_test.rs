//! Integration tests for the tenant repository using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use warden_core::models::tenant::{CreateTenant, TenantStatus};
use warden_core::repository::TenantRepository;
use warden_db::repository::SurrealTenantRepository;

async fn setup() -> SurrealTenantRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    warden_db::run_migrations(&db).await.unwrap();
    SurrealTenantRepository::new(db)
}

fn acme() -> CreateTenant {
    CreateTenant {
        name: "Acme".into(),
        slug: "acme".into(),
        status: TenantStatus::Active,
    }
}

#[tokio::test]
async fn create_and_get_tenant() {
    let repo = setup().await;

    let tenant = repo.create(acme()).await.unwrap();
    assert_eq!(tenant.slug, "acme");
    assert_eq!(tenant.status, TenantStatus::Active);

    let by_id = repo.get_by_id(tenant.id).await.unwrap();
    assert_eq!(by_id.name, "Acme");

    let by_slug = repo.get_by_slug("acme").await.unwrap();
    assert_eq!(by_slug.id, tenant.id);
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let repo = setup().await;
    let err = repo.get_by_slug("ghost").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn duplicate_slug_is_rejected() {
    let repo = setup().await;
    repo.create(acme()).await.unwrap();
    assert!(repo.create(acme()).await.is_err());
}

#[tokio::test]
async fn update_status_persists() {
    let repo = setup().await;
    let tenant = repo.create(acme()).await.unwrap();

    let updated = repo
        .update_status(tenant.id, TenantStatus::Suspended)
        .await
        .unwrap();
    assert_eq!(updated.status, TenantStatus::Suspended);

    let fetched = repo.get_by_slug("acme").await.unwrap();
    assert_eq!(fetched.status, TenantStatus::Suspended);
}

#[tokio::test]
async fn update_status_of_missing_tenant_is_not_found() {
    let repo = setup().await;
    let err = repo
        .update_status(uuid::Uuid::new_v4(), TenantStatus::Expired)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
