//! Integration test harness for the shop QR code API.
//!
//! Each test spawns the real router on an ephemeral port with in-memory
//! stores, then talks to it over HTTP with `reqwest`. Shopify is either a
//! canned [`StubGateway`] or a [`FakeShopify`] axum server that the real
//! `AdminClient` is pointed at.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shop-qr-integration-tests
//!
//! # Include the PostgreSQL store tests
//! QRCODES_DATABASE_URL=postgres://localhost/shop_qr_test \
//!     cargo test -p shop-qr-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use jsonwebtoken::{EncodingKey, Header};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;

use shop_qr_api::config::ScriptTagConfig;
use shop_qr_api::db::{MemoryQrCodeStore, MemoryShopSessionStore};
use shop_qr_api::middleware::SessionClaims;
use shop_qr_api::routes;
use shop_qr_api::shopify::{
    DiscountSummary, NewScriptTag, PlatformGateway, ScriptTag, ShopifyError,
};
use shop_qr_api::state::{AppState, StateSettings};
use shop_qr_api::tenant::Tenant;
use shop_qr_core::ShopDomain;

pub const API_KEY: &str = "integration-api-key";
pub const API_SECRET: &str = "integration-api-secret";
pub const APP_URL: &str = "https://qr.example.com";
pub const SHOP: &str = "shop1.myshopify.com";
pub const OTHER_SHOP: &str = "shop2.myshopify.com";

/// A running API server.
pub struct TestContext {
    pub client: reqwest::Client,
    pub base_url: String,
    pub store: Arc<MemoryQrCodeStore>,
    pub sessions: Arc<MemoryShopSessionStore>,
}

impl TestContext {
    /// Spawn the API with `SHOP` and `OTHER_SHOP` installed.
    pub async fn spawn(gateway: Arc<dyn PlatformGateway>) -> Self {
        Self::spawn_with(gateway, ScriptTagConfig::default()).await
    }

    /// Spawn the API with a custom script tag configuration.
    pub async fn spawn_with(gateway: Arc<dyn PlatformGateway>, script_tag: ScriptTagConfig) -> Self {
        let store = Arc::new(MemoryQrCodeStore::new());
        let sessions = Arc::new(MemoryShopSessionStore::new());
        sessions.insert(shop(SHOP), "shpat_shop1").await;
        sessions.insert(shop(OTHER_SHOP), "shpat_shop2").await;

        let settings = StateSettings {
            app_url: Url::parse(APP_URL).unwrap(),
            api_key: API_KEY.to_string(),
            api_secret: SecretString::from(API_SECRET),
            script_tag,
        };
        let state = AppState::new(settings, store.clone(), sessions.clone(), gateway);
        let addr = serve(routes::router(state)).await;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            client,
            base_url: format!("http://{addr}"),
            store,
            sessions,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET` as an authenticated admin of `shop`.
    pub fn get(&self, shop: &str, path: &str) -> reqwest::RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(session_token(shop))
    }

    /// `POST` as an authenticated admin of `shop`.
    pub fn post(&self, shop: &str, path: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(session_token(shop))
    }

    /// `PATCH` as an authenticated admin of `shop`.
    pub fn patch(&self, shop: &str, path: &str) -> reqwest::RequestBuilder {
        self.client.patch(self.url(path)).bearer_auth(session_token(shop))
    }

    /// `DELETE` as an authenticated admin of `shop`.
    pub fn delete(&self, shop: &str, path: &str) -> reqwest::RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(session_token(shop))
    }

    /// Create a QR code for `shop` and return the composed record.
    pub async fn create(&self, shop: &str, body: &Value) -> Value {
        let response = self.post(shop, "/api/qrcodes").json(body).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }
}

pub fn shop(domain: &str) -> ShopDomain {
    ShopDomain::parse(domain).unwrap()
}

/// Session token the embedded app frontend would send for `shop`.
pub fn session_token(shop_domain: &str) -> String {
    sign(&SessionClaims::for_shop(&shop(shop_domain), API_KEY, 60), API_SECRET)
}

pub fn sign(claims: &SessionClaims, secret: &str) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// Bind `router` to an ephemeral local port and serve it in the background.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Canned Shopify responses.
#[derive(Debug, Default)]
pub struct StubGateway {
    pub discounts: Vec<DiscountSummary>,
    pub script_tags: Vec<ScriptTag>,
    pub fail_discounts: bool,
    pub created: Mutex<Vec<(ShopDomain, NewScriptTag)>>,
}

impl StubGateway {
    pub fn with_discounts(discounts: &[(&str, &str)]) -> Self {
        Self {
            discounts: discounts
                .iter()
                .map(|(id, code)| DiscountSummary {
                    id: (*id).to_string(),
                    code: (*code).to_string(),
                })
                .collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl PlatformGateway for StubGateway {
    async fn list_discounts(
        &self,
        _tenant: &Tenant,
        limit: u32,
    ) -> Result<Vec<DiscountSummary>, ShopifyError> {
        if self.fail_discounts {
            return Err(ShopifyError::RateLimited(2));
        }
        Ok(self
            .discounts
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_script_tags(
        &self,
        _tenant: &Tenant,
        _since_id: &str,
    ) -> Result<Vec<ScriptTag>, ShopifyError> {
        Ok(self.script_tags.clone())
    }

    async fn create_script_tag(
        &self,
        tenant: &Tenant,
        tag: &NewScriptTag,
    ) -> Result<ScriptTag, ShopifyError> {
        let mut created = self.created.lock().unwrap();
        created.push((tenant.shop.clone(), tag.clone()));
        Ok(ScriptTag {
            id: i64::try_from(created.len()).unwrap(),
            src: tag.src.clone(),
            event: tag.event.clone(),
            display_scope: Some("all".to_string()),
            created_at: None,
            updated_at: None,
        })
    }
}

/// A request received by [`FakeShopify`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub access_token: Option<String>,
    pub body: Value,
}

/// Local stand-in for the Shopify Admin API.
#[derive(Clone, Default)]
pub struct FakeShopify {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    /// Status every endpoint answers with instead of succeeding.
    failure: Arc<Mutex<Option<(StatusCode, HeaderMap)>>>,
}

impl FakeShopify {
    /// Serve the fake and return its base URL.
    pub async fn start(&self, api_version: &str) -> Url {
        let prefix = format!("/admin/api/{api_version}");
        let router = Router::new()
            .route(&format!("{prefix}/graphql.json"), post(graphql))
            .route(
                &format!("{prefix}/script_tags.json"),
                get(list_script_tags).post(create_script_tag),
            )
            .with_state(self.clone());

        let addr = serve(router).await;
        Url::parse(&format!("http://{addr}")).unwrap()
    }

    /// Answer every subsequent request with `status` and `headers`.
    pub fn fail_with(&self, status: StatusCode, headers: HeaderMap) {
        *self.failure.lock().unwrap() = Some((status, headers));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(
        &self,
        method: &'static str,
        path: &str,
        headers: &HeaderMap,
        body: Value,
    ) -> Result<(), (StatusCode, HeaderMap, String)> {
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            path: path.to_string(),
            access_token: headers
                .get("X-Shopify-Access-Token")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        });

        match self.failure.lock().unwrap().clone() {
            Some((status, headers)) => Err((status, headers, "{\"errors\":\"fake\"}".to_string())),
            None => Ok(()),
        }
    }
}

async fn graphql(
    State(fake): State<FakeShopify>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, HeaderMap, String)> {
    fake.record("POST", "graphql.json", &headers, body)?;
    Ok(Json(json!({
        "data": {
            "codeDiscountNodes": {
                "edges": [
                    {"node": {
                        "id": "gid://shopify/DiscountCodeNode/1",
                        "codeDiscount": {"codes": {"edges": [{"node": {"code": "SPRING10"}}]}}
                    }},
                    {"node": {
                        "id": "gid://shopify/DiscountCodeNode/2",
                        "codeDiscount": {}
                    }}
                ]
            }
        }
    })))
}

async fn list_script_tags(
    State(fake): State<FakeShopify>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, HeaderMap, String)> {
    let path = match query {
        Some(query) => format!("script_tags.json?{query}"),
        None => "script_tags.json".to_string(),
    };
    fake.record("GET", &path, &headers, Value::Null)?;
    Ok(Json(json!({
        "script_tags": [{
            "id": 596_726_825,
            "src": "https://cdn.example.com/qr.js",
            "event": "onload",
            "display_scope": "all",
            "created_at": "2025-03-01T10:00:00-05:00",
            "updated_at": "2025-03-01T10:00:00-05:00"
        }]
    })))
}

async fn create_script_tag(
    State(fake): State<FakeShopify>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, HeaderMap, String)> {
    fake.record("POST", "script_tags.json", &headers, body.clone())?;
    let tag = &body["script_tag"];
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "script_tag": {
                "id": 870_402_694,
                "src": tag["src"],
                "event": tag["event"],
                "display_scope": "all"
            }
        })),
    ))
}
