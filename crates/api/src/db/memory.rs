//! In-process stores for tests and local development.
//!
//! Records live in a `BTreeMap` keyed by id, so iteration order is insertion
//! order. Locks are never held across an `.await` on another service.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use tokio::sync::RwLock;

use shop_qr_core::{QrCode, QrCodeFields, QrCodeId, ShopDomain};

use super::{QrCodeStore, RepositoryError, ShopSession, ShopSessionStore};

/// QR code store held in memory.
#[derive(Debug)]
pub struct MemoryQrCodeStore {
    next_id: AtomicI32,
    records: RwLock<BTreeMap<QrCodeId, QrCode>>,
}

impl Default for MemoryQrCodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQrCodeStore {
    /// Create an empty store. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicI32::new(1),
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored records across all shops.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl QrCodeStore for MemoryQrCodeStore {
    async fn create(
        &self,
        shop: &ShopDomain,
        fields: &QrCodeFields,
    ) -> Result<QrCodeId, RepositoryError> {
        let id = QrCodeId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let fields = fields.clone();
        let record = QrCode {
            id,
            shop_domain: shop.clone(),
            title: fields.title,
            product_id: fields.product_id,
            variant_id: fields.variant_id,
            collection_id: fields.collection_id,
            destination: fields.destination,
            discount_id: fields.discount_id,
            discount_code: fields.discount_code,
            scans_count: 0,
            created_at: Utc::now(),
        };

        self.records.write().await.insert(id, record);
        Ok(id)
    }

    async fn read(&self, id: QrCodeId) -> Result<QrCode, RepositoryError> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update(&self, id: QrCodeId, fields: &QrCodeFields) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        let fields = fields.clone();
        record.title = fields.title;
        record.product_id = fields.product_id;
        record.variant_id = fields.variant_id;
        record.collection_id = fields.collection_id;
        record.destination = fields.destination;
        record.discount_id = fields.discount_id;
        record.discount_code = fields.discount_code;
        Ok(())
    }

    async fn list(&self, shop: &ShopDomain) -> Result<Vec<QrCode>, RepositoryError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|record| record.is_owned_by(shop))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: QrCodeId) -> Result<(), RepositoryError> {
        self.records
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn record_scan(&self, id: QrCodeId) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.scans_count += 1;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Shop session store held in memory.
#[derive(Debug, Default)]
pub struct MemoryShopSessionStore {
    sessions: RwLock<HashMap<ShopDomain, ShopSession>>,
}

impl MemoryShopSessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a shop with the given offline token.
    pub async fn insert(&self, shop: ShopDomain, access_token: impl Into<String>) {
        let session = ShopSession {
            shop: shop.clone(),
            access_token: SecretString::from(access_token.into()),
            scopes: Vec::new(),
            updated_at: Utc::now(),
        };
        self.sessions.write().await.insert(shop, session);
    }

    /// Uninstall a shop. Returns whether it was present.
    pub async fn remove(&self, shop: &ShopDomain) -> bool {
        self.sessions.write().await.remove(shop).is_some()
    }
}

#[async_trait]
impl ShopSessionStore for MemoryShopSessionStore {
    async fn find(&self, shop: &ShopDomain) -> Result<Option<ShopSession>, RepositoryError> {
        Ok(self.sessions.read().await.get(shop).cloned())
    }
}
