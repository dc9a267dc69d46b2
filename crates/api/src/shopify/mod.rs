//! Shopify Admin API gateway.
//!
//! # Architecture
//!
//! - Discounts are read through the Admin GraphQL endpoint
//! - Theme script tags are managed through the Admin REST `script_tags` resource
//! - Every call uses the tenant's offline access token
//! - Responses are decoded into the narrow types below at this boundary
//!
//! The service layer only sees the [`PlatformGateway`] trait so tests can
//! substitute a fake shop.
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_qr_api::shopify::{AdminClient, PlatformGateway};
//!
//! let client = AdminClient::new("2025-01");
//! let discounts = client.list_discounts(&tenant, 25).await?;
//! ```

mod client;
pub mod queries;

pub use client::AdminClient;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tenant::Tenant;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// REST endpoint answered with a non-success status.
    #[error("Shopify returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Path to the error in the response.
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A code discount: its node ID and first redeemable code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountSummary {
    /// Discount node ID (e.g., `gid://shopify/DiscountCodeNode/1`).
    pub id: String,
    /// Customer-facing code.
    pub code: String,
}

/// A script tag installed on the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTag {
    /// Numeric script tag ID.
    pub id: i64,
    /// URL of the injected script.
    pub src: String,
    /// DOM event that triggers loading (always `onload`).
    pub event: String,
    /// Where the script is injected (`online_store`, `order_status`, `all`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

/// A script tag to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewScriptTag {
    /// DOM event that triggers loading.
    pub event: String,
    /// URL of the script to inject.
    pub src: String,
}

impl NewScriptTag {
    /// A script loaded on the storefront's `onload` event.
    #[must_use]
    pub fn onload(src: impl Into<String>) -> Self {
        Self {
            event: "onload".to_string(),
            src: src.into(),
        }
    }
}

/// The Shopify operations this service depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// Up to `limit` code discounts of the tenant's shop.
    async fn list_discounts(
        &self,
        tenant: &Tenant,
        limit: u32,
    ) -> Result<Vec<DiscountSummary>, ShopifyError>;

    /// Script tags created after `since_id`.
    async fn list_script_tags(
        &self,
        tenant: &Tenant,
        since_id: &str,
    ) -> Result<Vec<ScriptTag>, ShopifyError>;

    /// Install a script tag. Shopify does not deduplicate.
    async fn create_script_tag(
        &self,
        tenant: &Tenant,
        tag: &NewScriptTag,
    ) -> Result<ScriptTag, ShopifyError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError {
                message: "Field not found".to_string(),
                path: vec![],
            },
            GraphQLError {
                message: "Access denied".to_string(),
                path: vec![],
            },
        ];
        let err = ShopifyError::GraphQL(errors);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Access denied"
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ShopifyError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }

    #[test]
    fn test_api_error() {
        let err = ShopifyError::Api {
            status: 422,
            message: "src is invalid".to_string(),
        };
        assert_eq!(err.to_string(), "Shopify returned 422: src is invalid");
    }

    #[test]
    fn test_script_tag_decodes_rest_payload() {
        let tag: ScriptTag = serde_json::from_value(serde_json::json!({
            "id": 596_726_825,
            "src": "https://example.com/script.js",
            "event": "onload",
            "cache": false,
            "created_at": "2024-01-02T10:00:00-05:00",
            "updated_at": "2024-01-02T10:00:00-05:00",
            "display_scope": "all"
        }))
        .unwrap();

        assert_eq!(tag.id, 596_726_825);
        assert_eq!(tag.display_scope.as_deref(), Some("all"));
        assert!(tag.created_at.is_some());
    }

    #[test]
    fn test_new_script_tag_onload() {
        let tag = NewScriptTag::onload("https://example.com/a.js");
        assert_eq!(
            serde_json::to_value(&tag).unwrap(),
            serde_json::json!({"event": "onload", "src": "https://example.com/a.js"})
        );
    }
}
