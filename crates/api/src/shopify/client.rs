//! Shopify Admin API client authenticated with a shop's offline token.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::instrument;
use url::Url;

use crate::tenant::Tenant;

use super::{
    DiscountSummary, GraphQLError, NewScriptTag, PlatformGateway, ScriptTag, ShopifyError,
    queries::{DISCOUNTS_QUERY, DiscountsData, DiscountsVariables},
};

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";
const MAX_ERROR_BODY: usize = 512;

/// Shopify Admin API client.
///
/// One client serves every shop; the shop and token come from the
/// [`Tenant`] passed to each call.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    api_version: String,
    /// Fixed host instead of `https://{shop}` (local fakes).
    base_url: Option<Url>,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("api_version", &self.inner.api_version)
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

/// GraphQL request body.
#[derive(Debug, Serialize)]
struct GraphQLRequest<'a, V> {
    query: &'a str,
    variables: V,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct ScriptTagsEnvelope {
    script_tags: Vec<ScriptTag>,
}

#[derive(Debug, Deserialize)]
struct ScriptTagEnvelope {
    script_tag: ScriptTag,
}

#[derive(Debug, Serialize)]
struct NewScriptTagEnvelope<'a> {
    script_tag: &'a NewScriptTag,
}

impl AdminClient {
    /// Create a client for the given Admin API version.
    #[must_use]
    pub fn new(api_version: impl Into<String>) -> Self {
        Self::build(api_version.into(), None)
    }

    /// Create a client that sends every request to `base_url`, whatever the shop.
    #[must_use]
    pub fn with_base_url(api_version: impl Into<String>, base_url: Url) -> Self {
        Self::build(api_version.into(), Some(base_url))
    }

    fn build(api_version: String, base_url: Option<Url>) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                client: reqwest::Client::new(),
                api_version,
                base_url,
            }),
        }
    }

    /// Admin API endpoint for `resource` on the tenant's shop.
    fn endpoint(&self, tenant: &Tenant, resource: &str) -> String {
        let origin = self.inner.base_url.as_ref().map_or_else(
            || format!("https://{}", tenant.shop),
            |url| url.as_str().trim_end_matches('/').to_string(),
        );
        format!(
            "{origin}/admin/api/{}/{resource}",
            self.inner.api_version
        )
    }

    /// Execute a GraphQL query against the Admin API.
    async fn execute<V, T>(&self, tenant: &Tenant, query: &str, variables: V) -> Result<T, ShopifyError>
    where
        V: Serialize + Send,
        T: DeserializeOwned,
    {
        let response = self
            .inner
            .client
            .post(self.endpoint(tenant, "graphql.json"))
            .header(ACCESS_TOKEN_HEADER, tenant.access_token.expose_secret())
            .json(&GraphQLRequest { query, variables })
            .send()
            .await?;

        let response = check_status(response).await?;
        let graphql_response: GraphQLResponse<T> = serde_json::from_slice(&response.bytes().await?)?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            return Err(ShopifyError::GraphQL(errors));
        }

        graphql_response.data.ok_or_else(|| {
            ShopifyError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                path: vec![],
            }])
        })
    }
}

/// Map rate limiting, auth failures and other non-success statuses to errors.
async fn check_status(response: Response) -> Result<Response, ShopifyError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(60);
        return Err(ShopifyError::RateLimited(retry_after));
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ShopifyError::Unauthorized(
            "Invalid or expired access token".to_string(),
        ));
    }

    if !status.is_success() {
        let mut message = response.text().await.unwrap_or_default();
        if message.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }
        return Err(ShopifyError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(response)
}

#[async_trait]
impl PlatformGateway for AdminClient {
    #[instrument(skip(self, tenant), fields(shop = %tenant.shop))]
    async fn list_discounts(
        &self,
        tenant: &Tenant,
        limit: u32,
    ) -> Result<Vec<DiscountSummary>, ShopifyError> {
        let data: DiscountsData = self
            .execute(tenant, DISCOUNTS_QUERY, DiscountsVariables { first: limit })
            .await?;

        Ok(data.into_summaries())
    }

    #[instrument(skip(self, tenant), fields(shop = %tenant.shop))]
    async fn list_script_tags(
        &self,
        tenant: &Tenant,
        since_id: &str,
    ) -> Result<Vec<ScriptTag>, ShopifyError> {
        let response = self
            .inner
            .client
            .get(self.endpoint(tenant, "script_tags.json"))
            .query(&[("since_id", since_id)])
            .header(ACCESS_TOKEN_HEADER, tenant.access_token.expose_secret())
            .send()
            .await?;

        let response = check_status(response).await?;
        let envelope: ScriptTagsEnvelope = serde_json::from_slice(&response.bytes().await?)?;
        Ok(envelope.script_tags)
    }

    #[instrument(skip(self, tenant), fields(shop = %tenant.shop, src = %tag.src))]
    async fn create_script_tag(
        &self,
        tenant: &Tenant,
        tag: &NewScriptTag,
    ) -> Result<ScriptTag, ShopifyError> {
        let response = self
            .inner
            .client
            .post(self.endpoint(tenant, "script_tags.json"))
            .header(ACCESS_TOKEN_HEADER, tenant.access_token.expose_secret())
            .json(&NewScriptTagEnvelope { script_tag: tag })
            .send()
            .await?;

        let response = check_status(response).await?;
        let envelope: ScriptTagEnvelope = serde_json::from_slice(&response.bytes().await?)?;
        tracing::info!(script_tag_id = envelope.script_tag.id, "Created script tag");
        Ok(envelope.script_tag)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use shop_qr_core::ShopDomain;

    use super::*;

    fn tenant() -> Tenant {
        Tenant {
            shop: ShopDomain::parse("shop1.example").unwrap(),
            access_token: SecretString::from("shpat_test"),
        }
    }

    #[test]
    fn test_endpoint_uses_shop_domain() {
        let client = AdminClient::new("2025-01");
        assert_eq!(
            client.endpoint(&tenant(), "graphql.json"),
            "https://shop1.example/admin/api/2025-01/graphql.json"
        );
    }

    #[test]
    fn test_endpoint_with_base_url() {
        let client =
            AdminClient::with_base_url("2025-01", Url::parse("http://127.0.0.1:9999/").unwrap());
        assert_eq!(
            client.endpoint(&tenant(), "script_tags.json"),
            "http://127.0.0.1:9999/admin/api/2025-01/script_tags.json"
        );
    }

    #[test]
    fn test_debug_omits_http_client() {
        let client = AdminClient::new("2025-01");
        let debug_output = format!("{client:?}");
        assert!(debug_output.contains("2025-01"));
    }

    #[test]
    fn test_graphql_request_shape() {
        let body = serde_json::to_value(GraphQLRequest {
            query: DISCOUNTS_QUERY,
            variables: DiscountsVariables { first: 25 },
        })
        .unwrap();

        assert_eq!(body["variables"]["first"], 25);
        assert!(body["query"].as_str().unwrap().contains("codeDiscountNodes"));
    }
}
