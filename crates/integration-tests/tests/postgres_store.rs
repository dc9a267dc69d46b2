//! `PostgreSQL` store tests.
//!
//! Require a database reachable at `QRCODES_DATABASE_URL`; run with
//! `cargo test -p shop-qr-integration-tests -- --ignored`.

#![allow(clippy::unwrap_used)]

use secrecy::{ExposeSecret, SecretString};
use shop_qr_api::db::{
    self, PgQrCodeStore, PgShopSessionStore, QrCodeStore, RepositoryError, ShopSessionStore,
};
use shop_qr_core::{Destination, QrCodeFields, QrCodeId};
use shop_qr_integration_tests::shop;
use sqlx::PgPool;

async fn pool() -> PgPool {
    let url = std::env::var("QRCODES_DATABASE_URL").unwrap();
    let pool = db::create_pool(&SecretString::from(url)).await.unwrap();
    sqlx::migrate!("../api/migrations").run(&pool).await.unwrap();
    pool
}

/// A shop domain unique to this test run.
fn unique_shop(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}.myshopify.com")
}

fn collection(title: &str) -> QrCodeFields {
    QrCodeFields {
        title: title.to_string(),
        product_id: None,
        variant_id: None,
        collection_id: Some("gid://shopify/Collection/1".to_string()),
        destination: Destination::Collection,
        discount_id: None,
        discount_code: None,
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_qr_code_lifecycle() {
    let store = PgQrCodeStore::new(pool().await);
    let owner = shop(&unique_shop("lifecycle"));

    let id = store.create(&owner, &collection("Shirts")).await.unwrap();
    let record = store.read(id).await.unwrap();
    assert_eq!(record.shop_domain, owner);
    assert_eq!(record.scans_count, 0);

    store.record_scan(id).await.unwrap();
    store.record_scan(id).await.unwrap();
    assert_eq!(store.read(id).await.unwrap().scans_count, 2);

    store.update(id, &collection("Pants")).await.unwrap();
    assert_eq!(store.read(id).await.unwrap().title, "Pants");

    let listed = store.list(&owner).await.unwrap();
    assert_eq!(listed.len(), 1);

    store.delete(id).await.unwrap();
    assert!(matches!(store.read(id).await, Err(RepositoryError::NotFound)));
    assert!(matches!(store.delete(id).await, Err(RepositoryError::NotFound)));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_missing_record_is_not_found() {
    let store = PgQrCodeStore::new(pool().await);
    let missing = QrCodeId::new(i32::MAX);
    assert!(matches!(store.read(missing).await, Err(RepositoryError::NotFound)));
    assert!(matches!(
        store.record_scan(missing).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_shop_session_upsert_and_delete() {
    let store = PgShopSessionStore::new(pool().await);
    let owner = shop(&unique_shop("sessions"));
    let scopes = vec!["read_products".to_string()];

    store
        .save(&owner, &SecretString::from("shpat_first"), &scopes)
        .await
        .unwrap();
    store
        .save(&owner, &SecretString::from("shpat_second"), &scopes)
        .await
        .unwrap();

    let session = store.find(&owner).await.unwrap().unwrap();
    assert_eq!(session.access_token.expose_secret(), "shpat_second");
    assert_eq!(session.scopes, scopes);

    assert!(store.delete(&owner).await.unwrap());
    assert!(store.find(&owner).await.unwrap().is_none());
    assert!(!store.delete(&owner).await.unwrap());
}
