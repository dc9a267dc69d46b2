//! QR code lifecycle scoped to a tenant.
//!
//! Every operation resolves records through [`QrCodeService::find_owned`], so
//! a record of another shop is indistinguishable from a missing one.

use std::sync::Arc;

use tracing::instrument;

use shop_qr_core::{QrCode, QrCodeId, QrCodePatch, QrCodePayload};

use crate::db::QrCodeStore;
use crate::error::AppError;
use crate::tenant::Tenant;

use super::composer::{ClientQrCode, ResponseComposer, destination_url};

/// Orchestrates the store and the composer for the QR code endpoints.
#[derive(Clone)]
pub struct QrCodeService {
    store: Arc<dyn QrCodeStore>,
    composer: ResponseComposer,
}

impl QrCodeService {
    #[must_use]
    pub fn new(store: Arc<dyn QrCodeStore>, composer: ResponseComposer) -> Self {
        Self { store, composer }
    }

    /// Validate and persist a new QR code owned by the tenant.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for invalid input (nothing is stored)
    /// or `AppError::Storage` if the store fails.
    #[instrument(skip(self, tenant, payload), fields(shop = %tenant.shop))]
    pub async fn create(
        &self,
        tenant: &Tenant,
        payload: QrCodePayload,
    ) -> Result<ClientQrCode, AppError> {
        let fields = payload.into_fields()?;
        let id = self.store.create(&tenant.shop, &fields).await?;
        tracing::info!(qr_code_id = %id, destination = %fields.destination, "Created QR code");

        let record = self.store.read(id).await?;
        self.compose_one(tenant, record).await
    }

    /// Apply a patch to one of the tenant's QR codes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the record is absent or foreign (no
    /// write happens), `AppError::Validation` if the merged record is
    /// invalid, or `AppError::Storage` if the store fails.
    #[instrument(skip(self, tenant, patch), fields(shop = %tenant.shop))]
    pub async fn update(
        &self,
        tenant: &Tenant,
        id: QrCodeId,
        patch: QrCodePatch,
    ) -> Result<ClientQrCode, AppError> {
        let current = self.find_owned(tenant, id).await?;
        let fields = patch.apply_to(&current)?;

        self.store.update(id, &fields).await.map_err(AppError::from_lookup)?;

        let record = self.store.read(id).await.map_err(AppError::from_lookup)?;
        self.compose_one(tenant, record).await
    }

    /// All of the tenant's QR codes, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` if the store fails.
    #[instrument(skip(self, tenant), fields(shop = %tenant.shop))]
    pub async fn list(&self, tenant: &Tenant) -> Result<Vec<ClientQrCode>, AppError> {
        let records = self.store.list(&tenant.shop).await?;
        Ok(self.composer.compose(tenant, records).await)
    }

    /// One of the tenant's QR codes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the record is absent or foreign.
    #[instrument(skip(self, tenant), fields(shop = %tenant.shop))]
    pub async fn get(&self, tenant: &Tenant, id: QrCodeId) -> Result<ClientQrCode, AppError> {
        let record = self.find_owned(tenant, id).await?;
        self.compose_one(tenant, record).await
    }

    /// Delete one of the tenant's QR codes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the record is absent or foreign.
    #[instrument(skip(self, tenant), fields(shop = %tenant.shop))]
    pub async fn delete(&self, tenant: &Tenant, id: QrCodeId) -> Result<(), AppError> {
        self.find_owned(tenant, id).await?;
        self.store.delete(id).await.map_err(AppError::from_lookup)?;
        tracing::info!(qr_code_id = %id, "Deleted QR code");
        Ok(())
    }

    /// Count a scan and return the URL to redirect to.
    ///
    /// Uses the stored discount code; no Shopify call is made.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the record does not exist.
    #[instrument(skip(self))]
    pub async fn scan(&self, id: QrCodeId) -> Result<String, AppError> {
        let record = self.store.read(id).await.map_err(AppError::from_lookup)?;
        self.store.record_scan(id).await.map_err(AppError::from_lookup)?;
        Ok(destination_url(&record, record.discount_code.as_deref()))
    }

    /// Load a record, treating other shops' records as missing.
    async fn find_owned(&self, tenant: &Tenant, id: QrCodeId) -> Result<QrCode, AppError> {
        let record = self.store.read(id).await.map_err(AppError::from_lookup)?;
        if !record.is_owned_by(&tenant.shop) {
            tracing::debug!(qr_code_id = %id, "QR code belongs to another shop");
            return Err(AppError::NotFound);
        }
        Ok(record)
    }

    async fn compose_one(&self, tenant: &Tenant, record: QrCode) -> Result<ClientQrCode, AppError> {
        self.composer
            .compose(tenant, vec![record])
            .await
            .pop()
            .ok_or_else(|| AppError::Internal("composer returned no record".to_string()))
    }
}
