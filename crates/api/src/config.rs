//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `QRCODES_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `APP_URL` - Public URL of this service (used for QR image and scan links)
//! - `SHOPIFY_API_KEY` - Shopify app API key (session token audience)
//! - `SHOPIFY_API_SECRET` - Shopify app API secret (session token signing key)
//!
//! ## Optional
//! - `APP_HOST` - Bind address (default: 127.0.0.1)
//! - `APP_PORT` - Listen port (default: 3000)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2025-01)
//! - `SCRIPT_TAG_SRC` - Asset injected by `/api/create-script`
//! - `SCRIPT_TAG_SINCE_ID` - Marker used by `/api/get-script` (default: 421379493)
//! - `SCRIPT_TAG_DEDUPE` - Reuse an existing script tag with the same src (default: false)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `APP_TLS_CERT` - PEM-encoded certificate chain
//! - `APP_TLS_KEY` - PEM-encoded private key

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_API_VERSION: &str = "2025-01";
const DEFAULT_SCRIPT_TAG_SRC: &str =
    "https://unpkg.com/@livenetworks/external-links@1.0.1/ln-external-links.js";
const DEFAULT_SCRIPT_TAG_SINCE_ID: &str = "421379493";

/// Secrets must carry at least this many bits of entropy per character.
const MIN_SECRET_BITS_PER_CHAR: f64 = 3.3;

/// Values that show up when a `.env.example` is copied without editing.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "changeme",
    "change-me",
    "placeholder",
    "replace",
    "your-",
    "your_",
    "example",
    "secret",
    "xxx",
    "todo",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
    #[error("Refusing weak secret in {0}: {1}")]
    WeakSecret(&'static str, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: SecretString,
    pub server: ServerConfig,
    /// Public base URL of this service
    pub app_url: Url,
    pub shopify: ShopifyAppConfig,
    pub script_tag: ScriptTagConfig,
    pub sentry: SentryConfig,
}

/// Where and how the HTTP server listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Serve HTTPS when set.
    pub tls: Option<TlsConfig>,
}

impl ServerConfig {
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// PEM material for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    pub cert_pem: String,
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem_bytes", &self.cert_pem.len())
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

/// Shopify app credentials.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct ShopifyAppConfig {
    /// App API key (the `aud` of session tokens)
    pub api_key: String,
    /// App API secret (signs session tokens)
    pub api_secret: SecretString,
    /// Admin API version, e.g. `2025-01`
    pub api_version: String,
}

impl std::fmt::Debug for ShopifyAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyAppConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Theme script injection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTagConfig {
    /// Asset URL injected into the storefront
    pub src: String,
    /// Script tags older than this ID are not listed
    pub since_id: String,
    /// Return an existing tag with the same `src` instead of creating another
    pub dedupe: bool,
}

impl Default for ScriptTagConfig {
    fn default() -> Self {
        Self {
            src: DEFAULT_SCRIPT_TAG_SRC.to_string(),
            since_id: DEFAULT_SCRIPT_TAG_SINCE_ID.to_string(),
            dedupe: false,
        }
    }
}

/// Error reporting. Disabled when `dsn` is unset.
#[derive(Debug, Clone, PartialEq)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl AppConfig {
    /// Load configuration from the process environment, reading `.env`
    /// first if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing, a value does
    /// not parse, or the API secret looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let database_url = vars
            .get("QRCODES_DATABASE_URL")
            .or_else(|| vars.get("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or(ConfigError::Missing("QRCODES_DATABASE_URL"))?;

        Ok(Self {
            database_url,
            server: ServerConfig {
                host: vars.parse_or("APP_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?,
                port: vars.parse_or("APP_PORT", DEFAULT_PORT)?,
                tls: tls_from(&vars)?,
            },
            app_url: parse_app_url(&vars.require("APP_URL")?)?,
            shopify: ShopifyAppConfig {
                api_key: vars.require("SHOPIFY_API_KEY")?,
                api_secret: strong_secret("SHOPIFY_API_SECRET", vars.require("SHOPIFY_API_SECRET")?)?,
                api_version: vars
                    .get("SHOPIFY_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            },
            script_tag: ScriptTagConfig {
                src: vars
                    .get("SCRIPT_TAG_SRC")
                    .unwrap_or_else(|| DEFAULT_SCRIPT_TAG_SRC.to_string()),
                since_id: vars
                    .get("SCRIPT_TAG_SINCE_ID")
                    .unwrap_or_else(|| DEFAULT_SCRIPT_TAG_SINCE_ID.to_string()),
                dedupe: vars.flag("SCRIPT_TAG_DEDUPE")?,
            },
            sentry: SentryConfig {
                dsn: vars.get("SENTRY_DSN"),
                environment: vars.get("SENTRY_ENVIRONMENT"),
                sample_rate: vars.parse_or("SENTRY_SAMPLE_RATE", 1.0)?,
                traces_sample_rate: vars.parse_or("SENTRY_TRACES_SAMPLE_RATE", 1.0)?,
            },
        })
    }
}

/// Typed access to a variable source. Empty values count as unset.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::Invalid(key, e.to_string()))
        })
    }

    fn flag(&self, key: &'static str) -> Result<bool, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(false);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::Invalid(
                key,
                format!("expected true or false, got '{other}'"),
            )),
        }
    }
}

fn tls_from<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<Option<TlsConfig>, ConfigError> {
    match (vars.get("APP_TLS_CERT"), vars.get("APP_TLS_KEY")) {
        (Some(cert_pem), Some(key)) => Ok(Some(TlsConfig {
            cert_pem,
            key_pem: SecretString::from(key),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::Missing("APP_TLS_KEY")),
        (None, Some(_)) => Err(ConfigError::Missing("APP_TLS_CERT")),
    }
}

/// Only http(s) URLs without a query are accepted.
fn parse_app_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::Invalid("APP_URL", e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.query().is_some() {
        return Err(ConfigError::Invalid(
            "APP_URL",
            "must be an http(s) URL without a query string".to_string(),
        ));
    }

    Ok(url)
}

/// Bits of entropy per character, from character frequencies.
fn entropy_per_char(value: &str) -> f64 {
    let mut chars: Vec<char> = value.chars().collect();
    if chars.is_empty() {
        return 0.0;
    }
    chars.sort_unstable();

    #[allow(clippy::cast_precision_loss)]
    let total = chars.len() as f64;
    chars
        .chunk_by(|a, b| a == b)
        .map(|run| {
            #[allow(clippy::cast_precision_loss)]
            let p = run.len() as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholders and low-entropy values for signing secrets.
fn strong_secret(key: &'static str, value: String) -> Result<SecretString, ConfigError> {
    let lower = value.to_lowercase();
    if let Some(marker) = PLACEHOLDER_MARKERS.iter().find(|m| lower.contains(*m)) {
        return Err(ConfigError::WeakSecret(
            key,
            format!("looks like a placeholder (contains '{marker}')"),
        ));
    }

    let bits = entropy_per_char(&value);
    if bits < MIN_SECRET_BITS_PER_CHAR {
        return Err(ConfigError::WeakSecret(
            key,
            format!("{bits:.2} bits/char is below {MIN_SECRET_BITS_PER_CHAR}"),
        ));
    }

    Ok(SecretString::from(value))
}
