//! Storefront script injection.

use std::sync::Arc;

use tracing::instrument;

use crate::config::ScriptTagConfig;
use crate::shopify::{NewScriptTag, PlatformGateway, ScriptTag, ShopifyError};
use crate::tenant::Tenant;

/// The first tag in `tags` loading `src`, if any.
#[must_use]
pub fn find_existing<'a>(tags: &'a [ScriptTag], src: &str) -> Option<&'a ScriptTag> {
    tags.iter().find(|tag| tag.src == src)
}

/// Lists and installs the configured storefront script.
#[derive(Clone)]
pub struct ScriptTagService {
    gateway: Arc<dyn PlatformGateway>,
    config: ScriptTagConfig,
}

impl ScriptTagService {
    #[must_use]
    pub fn new(gateway: Arc<dyn PlatformGateway>, config: ScriptTagConfig) -> Self {
        Self { gateway, config }
    }

    /// Script tags installed after the configured marker.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if the Admin API call fails.
    #[instrument(skip(self, tenant), fields(shop = %tenant.shop))]
    pub async fn list(&self, tenant: &Tenant) -> Result<Vec<ScriptTag>, ShopifyError> {
        let tags = self
            .gateway
            .list_script_tags(tenant, &self.config.since_id)
            .await?;
        tracing::debug!(count = tags.len(), "Loaded script tags");
        Ok(tags)
    }

    /// Install the configured script.
    ///
    /// With deduplication enabled an already installed tag with the same
    /// `src` is returned instead of creating another.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError` if an Admin API call fails.
    #[instrument(skip(self, tenant), fields(shop = %tenant.shop))]
    pub async fn install(&self, tenant: &Tenant) -> Result<ScriptTag, ShopifyError> {
        if self.config.dedupe {
            let tags = self
                .gateway
                .list_script_tags(tenant, &self.config.since_id)
                .await?;
            if let Some(existing) = find_existing(&tags, &self.config.src) {
                tracing::info!(script_tag_id = existing.id, "Script tag already installed");
                return Ok(existing.clone());
            }
        }

        self.gateway
            .create_script_tag(tenant, &NewScriptTag::onload(self.config.src.clone()))
            .await
    }
}
