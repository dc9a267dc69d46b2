//! Persistence for QR codes and shop sessions.
//!
//! # Tables
//!
//! - `qr_codes` - QR code records, scoped by `shop_domain`
//! - `shop_sessions` - Offline Admin API access tokens, one row per shop
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p shop-qr-cli -- migrate
//! ```
//!
//! Both stores are used through object-safe traits so the service layer
//! runs unchanged against `PostgreSQL` or the in-memory backends.

pub mod memory;
pub mod qr_codes;
pub mod shop_sessions;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shop_qr_core::{QrCode, QrCodeFields, QrCodeId, ShopDomain};

pub use memory::{MemoryQrCodeStore, MemoryShopSessionStore};
pub use qr_codes::PgQrCodeStore;
pub use shop_sessions::PgShopSessionStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., discount pairing check).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Keyed storage for QR code records.
///
/// `read`, `update`, `delete` and `record_scan` are keyed by id alone; tenant
/// scoping is the caller's job. `list` returns one shop's records in
/// insertion order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QrCodeStore: Send + Sync {
    /// Insert a record for `shop` and return its new id.
    async fn create(
        &self,
        shop: &ShopDomain,
        fields: &QrCodeFields,
    ) -> Result<QrCodeId, RepositoryError>;

    /// Fetch a record by id.
    async fn read(&self, id: QrCodeId) -> Result<QrCode, RepositoryError>;

    /// Replace the writable fields of a record.
    async fn update(&self, id: QrCodeId, fields: &QrCodeFields) -> Result<(), RepositoryError>;

    /// All records owned by `shop`, oldest first.
    async fn list(&self, shop: &ShopDomain) -> Result<Vec<QrCode>, RepositoryError>;

    /// Remove a record.
    async fn delete(&self, id: QrCodeId) -> Result<(), RepositoryError>;

    /// Increment the scan counter by one.
    async fn record_scan(&self, id: QrCodeId) -> Result<(), RepositoryError>;

    /// Cheap connectivity probe.
    async fn health_check(&self) -> Result<(), RepositoryError>;
}

/// A shop's offline Admin API session.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopSession {
    /// The installed shop.
    pub shop: ShopDomain,
    /// Offline access token (HIGH PRIVILEGE - redacted in debug output).
    pub access_token: SecretString,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// When the token was last written.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Lookup of offline sessions by shop.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShopSessionStore: Send + Sync {
    /// The stored session for `shop`, if the shop is installed.
    async fn find(&self, shop: &ShopDomain) -> Result<Option<ShopSession>, RepositoryError>;
}

/// Split a comma-separated scope column into scope names.
pub(crate) fn split_scopes(scope: &str) -> Vec<String> {
    scope
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
