//! Offline shop session repository for database operations.
//!
//! Each installed shop has one row holding its offline Admin API access
//! token. Rows are written by `sqr shop add` and read on every
//! authenticated request (through the tenant cache).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing::instrument;

use shop_qr_core::ShopDomain;

use super::{RepositoryError, ShopSession, ShopSessionStore, split_scopes};

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct ShopSessionRow {
    shop: String,
    access_token: String,
    scope: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ShopSessionRow> for ShopSession {
    type Error = RepositoryError;

    fn try_from(row: ShopSessionRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shop '{}': {e}", row.shop))
        })?;

        Ok(Self {
            shop,
            access_token: SecretString::from(row.access_token),
            scopes: split_scopes(&row.scope),
            updated_at: row.updated_at,
        })
    }
}

/// Repository for offline shop sessions.
#[derive(Debug, Clone)]
pub struct PgShopSessionStore {
    pool: PgPool,
}

impl PgShopSessionStore {
    /// Create a new shop session repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Save or update the session for a shop.
    ///
    /// Uses upsert to handle both new and existing shops.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(
        &self,
        shop: &ShopDomain,
        access_token: &SecretString,
        scopes: &[String],
    ) -> Result<(), RepositoryError> {
        let scope = scopes.join(",");

        sqlx::query(
            r"
            INSERT INTO shop_sessions (shop, access_token, scope)
            VALUES ($1, $2, $3)
            ON CONFLICT (shop) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                updated_at = now()
            ",
        )
        .bind(shop)
        .bind(access_token.expose_secret())
        .bind(scope)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete the session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop_sessions WHERE shop = $1")
            .bind(shop)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All stored sessions, ordered by shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if a stored shop is malformed.
    pub async fn list(&self) -> Result<Vec<ShopSession>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShopSessionRow>(
            r"
            SELECT shop, access_token, scope, updated_at
            FROM shop_sessions
            ORDER BY shop
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ShopSession::try_from).collect()
    }
}

#[async_trait]
impl ShopSessionStore for PgShopSessionStore {
    #[instrument(skip(self), fields(shop = %shop))]
    async fn find(&self, shop: &ShopDomain) -> Result<Option<ShopSession>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopSessionRow>(
            r"
            SELECT shop, access_token, scope, updated_at
            FROM shop_sessions
            WHERE shop = $1
            ",
        )
        .bind(shop)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ShopSession::try_from).transpose()
    }
}
