//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use url::Url;

use crate::config::{AppConfig, ScriptTagConfig};
use crate::db::{QrCodeStore, ShopSessionStore};
use crate::middleware::SessionTokenVerifier;
use crate::services::{QrCodeService, ResponseComposer, ScriptTagService};
use crate::shopify::PlatformGateway;
use crate::tenant::TenantResolver;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn QrCodeStore>,
    gateway: Arc<dyn PlatformGateway>,
    tenants: TenantResolver,
    session_tokens: SessionTokenVerifier,
    qr_codes: QrCodeService,
    script_tags: ScriptTagService,
}

/// The settings [`AppState`] needs, separated from process-level config so
/// tests can build state without environment variables.
#[derive(Debug, Clone)]
pub struct StateSettings {
    /// Public base URL of this service.
    pub app_url: Url,
    /// App API key (session token audience).
    pub api_key: String,
    /// App API secret (session token signing key).
    pub api_secret: SecretString,
    /// Theme script injection settings.
    pub script_tag: ScriptTagConfig,
}

impl From<&AppConfig> for StateSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            app_url: config.app_url.clone(),
            api_key: config.shopify.api_key.clone(),
            api_secret: config.shopify.api_secret.clone(),
            script_tag: config.script_tag.clone(),
        }
    }
}

impl AppState {
    /// Wire up services over the given backends.
    #[must_use]
    pub fn new(
        settings: StateSettings,
        store: Arc<dyn QrCodeStore>,
        sessions: Arc<dyn ShopSessionStore>,
        gateway: Arc<dyn PlatformGateway>,
    ) -> Self {
        let composer = ResponseComposer::new(settings.app_url, Arc::clone(&gateway));

        Self {
            inner: Arc::new(AppStateInner {
                qr_codes: QrCodeService::new(Arc::clone(&store), composer),
                script_tags: ScriptTagService::new(Arc::clone(&gateway), settings.script_tag),
                tenants: TenantResolver::new(sessions),
                session_tokens: SessionTokenVerifier::new(&settings.api_key, &settings.api_secret),
                store,
                gateway,
            }),
        }
    }

    /// QR code store (used directly only by the readiness probe).
    #[must_use]
    pub fn store(&self) -> &Arc<dyn QrCodeStore> {
        &self.inner.store
    }

    /// Shopify gateway.
    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn PlatformGateway> {
        &self.inner.gateway
    }

    /// Offline session lookup.
    #[must_use]
    pub fn tenants(&self) -> &TenantResolver {
        &self.inner.tenants
    }

    /// Session token verifier.
    #[must_use]
    pub fn session_tokens(&self) -> &SessionTokenVerifier {
        &self.inner.session_tokens
    }

    /// QR code lifecycle.
    #[must_use]
    pub fn qr_codes(&self) -> &QrCodeService {
        &self.inner.qr_codes
    }

    /// Storefront script injection.
    #[must_use]
    pub fn script_tags(&self) -> &ScriptTagService {
        &self.inner.script_tags
    }
}
