//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health               - Liveness
//! GET    /health/ready         - Readiness (store connectivity)
//!
//! # Public
//! GET    /qrcodes/{id}/scan    - Count a scan, 303 to the storefront
//!
//! # Session token required
//! GET    /api/discounts        - Shop's code discounts
//! GET    /api/get-script       - Check script tags
//! POST   /api/create-script    - Install the storefront script
//! GET    /api/qrcodes          - List QR codes
//! POST   /api/qrcodes          - Create a QR code
//! GET    /api/qrcodes/{id}     - Read a QR code
//! PATCH  /api/qrcodes/{id}     - Update a QR code
//! DELETE /api/qrcodes/{id}     - Delete a QR code
//! ```

pub mod discounts;
pub mod health;
pub mod qr_codes;
pub mod scan;
pub mod scripts;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Routes under `/api`.
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/discounts", get(discounts::index))
        .route("/get-script", get(scripts::show))
        .route("/create-script", post(scripts::create))
        .route("/qrcodes", get(qr_codes::index).post(qr_codes::create))
        .route(
            "/qrcodes/{id}",
            get(qr_codes::show)
                .patch(qr_codes::update)
                .delete(qr_codes::delete),
        )
}

/// The full application router with tracing and request IDs.
///
/// Sentry layers are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/qrcodes/{id}/scan", get(scan::scan))
        .nest("/api", api_routes())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        shop = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use url::Url;

    use shop_qr_core::ShopDomain;

    use super::*;
    use crate::config::ScriptTagConfig;
    use crate::db::{MemoryQrCodeStore, MemoryShopSessionStore, MockQrCodeStore, QrCodeStore};
    use crate::middleware::{REQUEST_ID_HEADER, SessionClaims};
    use crate::shopify::{DiscountSummary, MockPlatformGateway, ScriptTag};
    use crate::state::StateSettings;

    const API_KEY: &str = "test-api-key";
    const API_SECRET: &str = "k9$Vq2!mZ7@xL4#pR8&tW1*yN6^bC3";

    fn settings() -> StateSettings {
        StateSettings {
            app_url: Url::parse("https://qr.example.com").unwrap(),
            api_key: API_KEY.to_string(),
            api_secret: SecretString::from(API_SECRET),
            script_tag: ScriptTagConfig::default(),
        }
    }

    fn gateway() -> MockPlatformGateway {
        let mut gateway = MockPlatformGateway::new();
        gateway.expect_list_discounts().returning(|_, _| {
            Ok(vec![DiscountSummary {
                id: "d1".to_string(),
                code: "SAVE10".to_string(),
            }])
        });
        gateway.expect_list_script_tags().returning(|_, _| Ok(vec![]));
        gateway.expect_create_script_tag().returning(|_, tag| {
            Ok(ScriptTag {
                id: 1,
                src: tag.src.clone(),
                event: tag.event.clone(),
                display_scope: Some("all".to_string()),
                created_at: None,
                updated_at: None,
            })
        });
        gateway
    }

    async fn app_with(store: Arc<dyn QrCodeStore>) -> Router {
        let sessions = MemoryShopSessionStore::new();
        sessions
            .insert(ShopDomain::parse("shop1.example").unwrap(), "shpat_1")
            .await;
        sessions
            .insert(ShopDomain::parse("shop2.example").unwrap(), "shpat_2")
            .await;

        let state = AppState::new(settings(), store, Arc::new(sessions), Arc::new(gateway()));
        router(state)
    }

    async fn app() -> Router {
        app_with(Arc::new(MemoryQrCodeStore::new())).await
    }

    fn token(shop: &str) -> String {
        let claims = SessionClaims::for_shop(&ShopDomain::parse(shop).unwrap(), API_KEY, 60);
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(API_SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn request(method: &str, uri: &str, shop: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(shop) = shop {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(shop)));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn spring_sale() -> Value {
        json!({"title": "Spring Sale", "destination": "product", "productId": "p1"})
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app().await, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");

        let (status, _) = send(&app().await, request("GET", "/health/ready", None, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unauthenticated_requests_never_reach_the_store() {
        let mut store = MockQrCodeStore::new();
        store.expect_list().never();
        store.expect_create().never();
        let app = app_with(Arc::new(store)).await;

        let (status, body) = send(&app, request("GET", "/api/qrcodes", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "Could not find a Shopify session");

        let bad = Request::builder()
            .method("POST")
            .uri("/api/qrcodes")
            .header(header::AUTHORIZATION, "Bearer not-a-jwt")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(spring_sale().to_string()))
            .unwrap();
        let (status, _) = send(&app, bad).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_uninstalled_shop_is_unauthenticated() {
        let (status, _) = send(
            &app().await,
            request("GET", "/api/qrcodes", Some("shop3.example"), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_scenario() {
        let app = app().await;
        let mut payload = spring_sale();
        payload["shopDomain"] = json!("evil.example");

        let (status, body) = send(
            &app,
            request("POST", "/api/qrcodes", Some("shop1.example"), Some(payload)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let created: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(created["shopDomain"], "shop1.example");
        assert_eq!(created["scansCount"], 0);
        assert_eq!(created["destinationUrl"], "https://shop1.example/products/p1");
        assert!(created.get("discountCode").is_none());
    }

    #[tokio::test]
    async fn test_create_with_discount_scenario() {
        let app = app().await;
        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/qrcodes",
                Some("shop1.example"),
                Some(json!({
                    "title": "VIP",
                    "destination": "productWithDiscount",
                    "productId": "p1",
                    "discountId": "d1",
                    "discountCode": "SAVE10",
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(created["discountCode"], "SAVE10");
    }

    #[tokio::test]
    async fn test_validation_and_malformed_bodies_are_400() {
        let app = app().await;

        let (status, body) = send(
            &app,
            request(
                "POST",
                "/api/qrcodes",
                Some("shop1.example"),
                Some(json!({"title": "x", "destination": "collection"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "collectionId is required when destination is collection");

        let malformed = Request::builder()
            .method("POST")
            .uri("/api/qrcodes")
            .header(header::AUTHORIZATION, format!("Bearer {}", token("shop1.example")))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, malformed).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_id_is_404_with_empty_body() {
        let app = app().await;
        for uri in ["/api/qrcodes/999", "/api/qrcodes/not-an-id"] {
            let (status, body) = send(&app, request("GET", uri, Some("shop1.example"), None)).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert!(body.is_empty());
        }
    }

    #[tokio::test]
    async fn test_crud_and_isolation() {
        let app = app().await;
        let (_, body) = send(
            &app,
            request("POST", "/api/qrcodes", Some("shop1.example"), Some(spring_sale())),
        )
        .await;
        let id = serde_json::from_str::<Value>(&body).unwrap()["id"].as_i64().unwrap();
        let uri = format!("/api/qrcodes/{id}");

        let (status, _) = send(&app, request("GET", &uri, Some("shop2.example"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            request("PATCH", &uri, Some("shop1.example"), Some(json!({"title": "Summer Sale"}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["title"], "Summer Sale");

        let (status, body) = send(&app, request("GET", "/api/qrcodes", Some("shop2.example"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");

        let (status, body) = send(&app, request("DELETE", &uri, Some("shop1.example"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let (status, _) = send(&app, request("DELETE", &uri, Some("shop1.example"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_scan_redirects_and_counts() {
        let app = app().await;
        let (_, body) = send(
            &app,
            request("POST", "/api/qrcodes", Some("shop1.example"), Some(spring_sale())),
        )
        .await;
        let id = serde_json::from_str::<Value>(&body).unwrap()["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(request("GET", &format!("/qrcodes/{id}/scan"), None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://shop1.example/products/p1"
        );

        let (_, body) = send(
            &app,
            request("GET", &format!("/api/qrcodes/{id}"), Some("shop1.example"), None),
        )
        .await;
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["scansCount"], 1);
    }

    #[tokio::test]
    async fn test_platform_passthroughs() {
        let app = app().await;

        let (status, body) = send(&app, request("GET", "/api/discounts", Some("shop1.example"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_str::<Value>(&body).unwrap(),
            json!({"discounts": [{"id": "d1", "code": "SAVE10"}]})
        );

        let (status, body) = send(&app, request("GET", "/api/get-script", Some("shop1.example"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "true");

        let (status, body) = send(&app, request("POST", "/api/create-script", Some("shop1.example"), None)).await;
        assert_eq!(status, StatusCode::OK);
        let created: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(created["script_tag"]["src"], ScriptTagConfig::default().src);
        assert_eq!(created["script_tag"]["event"], "onload");
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let response = app()
            .await
            .oneshot(request("GET", "/health", None, None))
            .await
            .unwrap();
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }
}
