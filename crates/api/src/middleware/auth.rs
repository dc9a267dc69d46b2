//! Session token authentication.
//!
//! The embedded app frontend sends a Shopify session token as
//! `Authorization: Bearer <jwt>`. The token is an HS256 JWT signed with the
//! app's API secret whose `dest` claim names the shop. The shop must also
//! have an offline session stored, which supplies the Admin API token.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Span;
use url::Url;

use shop_qr_core::ShopDomain;

use crate::error::{AppError, set_sentry_shop};
use crate::state::AppState;
use crate::tenant::Tenant;

/// Clock skew tolerated on `exp` and `nbf`.
const LEEWAY_SECS: u64 = 5;

/// Claims of a Shopify session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Shop admin URL (`https://{shop}/admin`).
    pub iss: String,
    /// Shop URL (`https://{shop}`).
    pub dest: String,
    /// App API key.
    pub aud: String,
    /// Staff user ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: i64,
    pub nbf: i64,
    #[serde(default)]
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

impl SessionClaims {
    /// Claims for `shop` valid for `ttl_secs` from now.
    #[must_use]
    pub fn for_shop(shop: &ShopDomain, api_key: &str, ttl_secs: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            iss: format!("https://{shop}/admin"),
            dest: format!("https://{shop}"),
            aud: api_key.to_string(),
            sub: None,
            exp: now + ttl_secs,
            nbf: now,
            iat: now,
            jti: None,
            sid: None,
        }
    }
}

/// Reasons a session token is rejected.
#[derive(Debug, Error)]
pub enum SessionTokenError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("dest is not a shop URL: {0}")]
    InvalidDestination(String),
    #[error("iss does not match dest")]
    IssuerMismatch,
}

/// Verifies session tokens for one app.
#[derive(Clone)]
pub struct SessionTokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for SessionTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenVerifier")
            .field("audience", &self.validation.aud)
            .finish_non_exhaustive()
    }
}

impl SessionTokenVerifier {
    /// Create a verifier for the app identified by `api_key`.
    #[must_use]
    pub fn new(api_key: &str, api_secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[api_key]);
        validation.set_required_spec_claims(&["exp", "nbf", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = LEEWAY_SECS;

        Self {
            key: DecodingKey::from_secret(api_secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Verify a token and return the shop it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `SessionTokenError` if the signature, timing or audience
    /// checks fail, or if `dest` and `iss` do not name the same shop.
    pub fn verify(&self, token: &str) -> Result<ShopDomain, SessionTokenError> {
        let claims = jsonwebtoken::decode::<SessionClaims>(token, &self.key, &self.validation)?.claims;

        let dest_host = url_host(&claims.dest)
            .ok_or_else(|| SessionTokenError::InvalidDestination(claims.dest.clone()))?;
        let shop = ShopDomain::parse(&dest_host)
            .map_err(|_| SessionTokenError::InvalidDestination(claims.dest.clone()))?;

        match url_host(&claims.iss) {
            Some(iss_host) if iss_host.eq_ignore_ascii_case(shop.as_str()) => Ok(shop),
            _ => Err(SessionTokenError::IssuerMismatch),
        }
    }
}

fn url_host(value: &str) -> Option<String> {
    let url = Url::parse(value).ok()?;
    if url.scheme() != "https" {
        return None;
    }
    url.host_str().map(str::to_string)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|token| !token.is_empty())
}

/// Extractor that requires a valid session for an installed shop.
///
/// Rejects with 401 `Could not find a Shopify session` before the handler
/// runs.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentTenant(tenant): CurrentTenant) -> impl IntoResponse {
///     format!("Hello, {}!", tenant.shop)
/// }
/// ```
pub struct CurrentTenant(pub Tenant);

impl FromRequestParts<AppState> for CurrentTenant {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let shop = bearer_token(parts)
            .ok_or(SessionTokenError::Missing)
            .and_then(|token| state.session_tokens().verify(token))
            .map_err(|e| {
                tracing::debug!(error = %e, "Session token rejected");
                AppError::Unauthenticated
            })?;

        let Some(tenant) = state.tenants().resolve(&shop).await? else {
            tracing::debug!(shop = %shop, "No offline session for shop");
            return Err(AppError::Unauthenticated);
        };

        Span::current().record("shop", tenant.shop.as_str());
        set_sentry_shop(tenant.shop.as_str());

        Ok(Self(tenant))
    }
}
