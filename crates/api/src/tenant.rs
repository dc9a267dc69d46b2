//! The tenant a request acts for, and its offline session lookup.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::SecretString;

use shop_qr_core::ShopDomain;

use crate::db::{RepositoryError, ShopSessionStore};

/// An authenticated shop with its Admin API credentials.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct Tenant {
    /// The shop every operation is scoped to.
    pub shop: ShopDomain,
    /// Offline Admin API access token.
    pub access_token: SecretString,
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Resolves shops to tenants through the session store.
///
/// Found sessions are cached for one minute; misses are not cached so a
/// freshly installed shop works on its next request.
#[derive(Clone)]
pub struct TenantResolver {
    sessions: Arc<dyn ShopSessionStore>,
    cache: Cache<ShopDomain, Tenant>,
}

impl TenantResolver {
    /// Create a resolver over a session store.
    #[must_use]
    pub fn new(sessions: Arc<dyn ShopSessionStore>) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(60))
            .build();

        Self { sessions, cache }
    }

    /// The tenant for `shop`, or `None` if the shop has no offline session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the session store fails.
    pub async fn resolve(&self, shop: &ShopDomain) -> Result<Option<Tenant>, RepositoryError> {
        if let Some(tenant) = self.cache.get(shop).await {
            return Ok(Some(tenant));
        }

        let Some(session) = self.sessions.find(shop).await? else {
            return Ok(None);
        };

        let tenant = Tenant {
            shop: session.shop,
            access_token: session.access_token,
        };
        self.cache.insert(shop.clone(), tenant.clone()).await;
        Ok(Some(tenant))
    }
}
