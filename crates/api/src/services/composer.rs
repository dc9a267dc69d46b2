//! Turns stored QR codes into the records the frontend renders.
//!
//! A composed record carries every stored field plus:
//! - `qrCodeImageUrl`: where the scannable image for the code is served
//! - `destinationUrl`: the storefront URL a scan lands on
//! - `discountCode`: the current code of the linked discount
//!
//! `destinationUrl` is built from stored fields only, so it always matches
//! the scan redirect. The live discount code is display-only.
//!
//! The image route lives on the app frontend under `APP_URL`, which renders
//! the PNG for the code's scan URL. This service only links to it.
//!
//! Composition never writes to the store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use shop_qr_core::{Destination, QrCode, QrCodeId, ShopDomain};

use crate::shopify::PlatformGateway;
use crate::tenant::Tenant;

/// Maximum number of discounts fetched per request.
pub const DISCOUNT_LIMIT: u32 = 25;

/// A QR code as returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientQrCode {
    pub id: QrCodeId,
    pub shop_domain: ShopDomain,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    pub destination: Destination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,
    pub scans_count: i64,
    pub created_at: DateTime<Utc>,
    pub qr_code_image_url: String,
    pub destination_url: String,
}

/// Builds [`ClientQrCode`]s for a tenant.
#[derive(Clone)]
pub struct ResponseComposer {
    app_url: Url,
    gateway: Arc<dyn PlatformGateway>,
}

impl ResponseComposer {
    /// Create a composer that serves images from `app_url`.
    #[must_use]
    pub fn new(app_url: Url, gateway: Arc<dyn PlatformGateway>) -> Self {
        Self { app_url, gateway }
    }

    /// Compose records, preserving their order.
    ///
    /// The tenant's discounts are fetched once, and only if a record links
    /// to one. If that fetch fails the stored codes are used.
    pub async fn compose(&self, tenant: &Tenant, records: Vec<QrCode>) -> Vec<ClientQrCode> {
        let needs_discounts = records
            .iter()
            .any(|record| record.destination.requires_discount());

        let current_codes: HashMap<String, String> = if needs_discounts {
            match self.gateway.list_discounts(tenant, DISCOUNT_LIMIT).await {
                Ok(discounts) => discounts.into_iter().map(|d| (d.id, d.code)).collect(),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        shop = %tenant.shop,
                        "Failed to load discounts, using stored codes"
                    );
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        records
            .into_iter()
            .map(|record| {
                let discount_code = if record.destination.requires_discount() {
                    record
                        .discount_id
                        .as_ref()
                        .and_then(|id| current_codes.get(id).cloned())
                        .or_else(|| record.discount_code.clone())
                } else {
                    None
                };
                self.compose_one(record, discount_code)
            })
            .collect()
    }

    fn compose_one(&self, record: QrCode, discount_code: Option<String>) -> ClientQrCode {
        let qr_code_image_url = image_url(&self.app_url, record.id, &record.shop_domain);
        let destination_url = destination_url(&record, record.discount_code.as_deref());

        ClientQrCode {
            id: record.id,
            shop_domain: record.shop_domain,
            title: record.title,
            product_id: record.product_id,
            variant_id: record.variant_id,
            collection_id: record.collection_id,
            destination: record.destination,
            discount_id: record.discount_id,
            discount_code,
            scans_count: record.scans_count,
            created_at: record.created_at,
            qr_code_image_url,
            destination_url,
        }
    }
}

/// URL of the scannable image for a QR code.
#[must_use]
pub fn image_url(app_url: &Url, id: QrCodeId, shop: &ShopDomain) -> String {
    format!(
        "{}/qrcodes/{id}/image?shop={}",
        app_url.as_str().trim_end_matches('/'),
        urlencoding::encode(shop.as_str())
    )
}

/// Storefront URL a scan of `record` redirects to.
///
/// `discount_code` is the code to apply for `productWithDiscount` records.
#[must_use]
pub fn destination_url(record: &QrCode, discount_code: Option<&str>) -> String {
    let shop = record.shop_domain.as_str();
    let segment = |value: Option<&String>| {
        urlencoding::encode(value.map_or("", |v| numeric_id(v))).into_owned()
    };

    match record.destination {
        Destination::Product => {
            let mut url = format!(
                "https://{shop}/products/{}",
                segment(record.product_id.as_ref())
            );
            if record.variant_id.is_some() {
                url.push_str("?variant=");
                url.push_str(&segment(record.variant_id.as_ref()));
            }
            url
        }
        Destination::ProductWithDiscount => {
            let code = urlencoding::encode(discount_code.unwrap_or_default());
            let mut url = format!(
                "https://{shop}/discount/{code}?redirect=/products/{}",
                segment(record.product_id.as_ref())
            );
            if record.variant_id.is_some() {
                url.push_str("%3Fvariant%3D");
                url.push_str(&segment(record.variant_id.as_ref()));
            }
            url
        }
        Destination::Collection => format!(
            "https://{shop}/collections/{}",
            segment(record.collection_id.as_ref())
        ),
    }
}

/// `gid://shopify/Product/123` becomes `123`; other IDs pass through.
fn numeric_id(id: &str) -> &str {
    if id.starts_with("gid://") {
        id.rsplit('/').next().unwrap_or(id)
    } else {
        id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::shopify::{DiscountSummary, MockPlatformGateway, ShopifyError};

    fn tenant() -> Tenant {
        Tenant {
            shop: ShopDomain::parse("shop1.example").unwrap(),
            access_token: SecretString::from("shpat_test"),
        }
    }

    fn record(destination: Destination) -> QrCode {
        QrCode {
            id: QrCodeId::new(7),
            shop_domain: ShopDomain::parse("shop1.example").unwrap(),
            title: "Spring Sale".to_string(),
            product_id: None,
            variant_id: None,
            collection_id: None,
            destination,
            discount_id: None,
            discount_code: None,
            scans_count: 0,
            created_at: Utc::now(),
        }
    }

    fn discount_record() -> QrCode {
        QrCode {
            product_id: Some("gid://shopify/Product/1".to_string()),
            discount_id: Some("d1".to_string()),
            discount_code: Some("OLDCODE".to_string()),
            ..record(Destination::ProductWithDiscount)
        }
    }

    fn composer(gateway: MockPlatformGateway) -> ResponseComposer {
        ResponseComposer::new(
            Url::parse("https://qr.example.com/").unwrap(),
            Arc::new(gateway),
        )
    }

    #[test]
    fn test_numeric_id() {
        assert_eq!(numeric_id("gid://shopify/Product/123"), "123");
        assert_eq!(numeric_id("p1"), "p1");
    }

    #[test]
    fn test_image_url() {
        let url = image_url(
            &Url::parse("https://qr.example.com").unwrap(),
            QrCodeId::new(7),
            &ShopDomain::parse("shop1.example").unwrap(),
        );
        assert_eq!(url, "https://qr.example.com/qrcodes/7/image?shop=shop1.example");
    }

    #[test]
    fn test_product_destination_url() {
        let mut qr = record(Destination::Product);
        qr.product_id = Some("p1".to_string());
        assert_eq!(destination_url(&qr, None), "https://shop1.example/products/p1");

        qr.variant_id = Some("gid://shopify/ProductVariant/9".to_string());
        assert_eq!(
            destination_url(&qr, None),
            "https://shop1.example/products/p1?variant=9"
        );
    }

    #[test]
    fn test_discount_destination_url() {
        let mut qr = discount_record();
        assert_eq!(
            destination_url(&qr, Some("SAVE 10")),
            "https://shop1.example/discount/SAVE%2010?redirect=/products/1"
        );

        qr.variant_id = Some("5".to_string());
        assert_eq!(
            destination_url(&qr, Some("SAVE10")),
            "https://shop1.example/discount/SAVE10?redirect=/products/1%3Fvariant%3D5"
        );
    }

    #[test]
    fn test_collection_destination_url() {
        let mut qr = record(Destination::Collection);
        qr.collection_id = Some("gid://shopify/Collection/42".to_string());
        assert_eq!(
            destination_url(&qr, None),
            "https://shop1.example/collections/42"
        );
    }

    #[tokio::test]
    async fn test_empty_input_skips_gateway() {
        let mut gateway = MockPlatformGateway::new();
        gateway.expect_list_discounts().never();

        assert!(composer(gateway).compose(&tenant(), vec![]).await.is_empty());
    }

    #[tokio::test]
    async fn test_records_without_discounts_skip_gateway() {
        let mut gateway = MockPlatformGateway::new();
        gateway.expect_list_discounts().never();

        let mut qr = record(Destination::Product);
        qr.product_id = Some("p1".to_string());
        let composed = composer(gateway).compose(&tenant(), vec![qr]).await;

        assert_eq!(composed.len(), 1);
        assert_eq!(composed[0].discount_code, None);
        assert_eq!(composed[0].destination_url, "https://shop1.example/products/p1");
    }

    #[tokio::test]
    async fn test_current_discount_code_wins() {
        let mut gateway = MockPlatformGateway::new();
        gateway
            .expect_list_discounts()
            .times(1)
            .withf(|_, limit| *limit == DISCOUNT_LIMIT)
            .returning(|_, _| {
                Ok(vec![DiscountSummary {
                    id: "d1".to_string(),
                    code: "SAVE10".to_string(),
                }])
            });

        let composed = composer(gateway)
            .compose(&tenant(), vec![discount_record(), discount_record()])
            .await;

        assert!(composed.iter().all(|c| c.discount_code.as_deref() == Some("SAVE10")));
        assert!(composed[0].destination_url.contains("/discount/OLDCODE?"));
    }

    #[tokio::test]
    async fn test_gateway_failure_falls_back_to_stored_code() {
        let mut gateway = MockPlatformGateway::new();
        gateway
            .expect_list_discounts()
            .returning(|_, _| Err(ShopifyError::RateLimited(2)));

        let composed = composer(gateway)
            .compose(&tenant(), vec![discount_record()])
            .await;

        assert_eq!(composed[0].discount_code.as_deref(), Some("OLDCODE"));
    }

    #[tokio::test]
    async fn test_serialized_shape() {
        let mut gateway = MockPlatformGateway::new();
        gateway.expect_list_discounts().never();

        let mut qr = record(Destination::Product);
        qr.product_id = Some("p1".to_string());
        let composed = composer(gateway).compose(&tenant(), vec![qr]).await;
        let json = serde_json::to_value(&composed[0]).unwrap();

        assert_eq!(json["shopDomain"], "shop1.example");
        assert_eq!(json["scansCount"], 0);
        assert_eq!(
            json["qrCodeImageUrl"],
            "https://qr.example.com/qrcodes/7/image?shop=shop1.example"
        );
        assert!(json.get("discountCode").is_none());
        assert!(json.get("collectionId").is_none());
    }
}
