//! `PostgreSQL` QR code store.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use shop_qr_core::{QrCode, QrCodeFields, QrCodeId, ShopDomain};

use super::{QrCodeStore, RepositoryError};

const SELECT_COLUMNS: &str = r"
    SELECT
        id,
        shop_domain,
        title,
        product_id,
        variant_id,
        collection_id,
        destination,
        discount_id,
        discount_code,
        scans_count,
        created_at
    FROM qr_codes
";

/// QR code store backed by the `qr_codes` table.
#[derive(Debug, Clone)]
pub struct PgQrCodeStore {
    pool: PgPool,
}

impl PgQrCodeStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map check violations to `Conflict` so callers can tell them from outages.
fn map_write_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_check_violation()
    {
        return RepositoryError::Conflict(db_err.message().to_string());
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl QrCodeStore for PgQrCodeStore {
    #[instrument(skip(self, fields), fields(shop = %shop))]
    async fn create(
        &self,
        shop: &ShopDomain,
        fields: &QrCodeFields,
    ) -> Result<QrCodeId, RepositoryError> {
        let id: QrCodeId = sqlx::query_scalar(
            r"
            INSERT INTO qr_codes (
                shop_domain, title, product_id, variant_id, collection_id,
                destination, discount_id, discount_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            ",
        )
        .bind(shop)
        .bind(&fields.title)
        .bind(&fields.product_id)
        .bind(&fields.variant_id)
        .bind(&fields.collection_id)
        .bind(fields.destination)
        .bind(&fields.discount_id)
        .bind(&fields.discount_code)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(id)
    }

    #[instrument(skip(self))]
    async fn read(&self, id: QrCodeId) -> Result<QrCode, RepositoryError> {
        sqlx::query_as::<_, QrCode>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self, fields))]
    async fn update(&self, id: QrCodeId, fields: &QrCodeFields) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE qr_codes SET
                title = $2,
                product_id = $3,
                variant_id = $4,
                collection_id = $5,
                destination = $6,
                discount_id = $7,
                discount_code = $8
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&fields.title)
        .bind(&fields.product_id)
        .bind(&fields.variant_id)
        .bind(&fields.collection_id)
        .bind(fields.destination)
        .bind(&fields.discount_id)
        .bind(&fields.discount_code)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(shop = %shop))]
    async fn list(&self, shop: &ShopDomain) -> Result<Vec<QrCode>, RepositoryError> {
        let records = sqlx::query_as::<_, QrCode>(&format!(
            "{SELECT_COLUMNS} WHERE shop_domain = $1 ORDER BY id"
        ))
        .bind(shop)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: QrCodeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM qr_codes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_scan(&self, id: QrCodeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE qr_codes SET scans_count = scans_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
