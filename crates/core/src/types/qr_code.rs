//! The QR code record and its client-writable fields.
//!
//! A QR code's target fields must match its [`Destination`]:
//!
//! | destination           | product | variant  | collection | discount id + code |
//! |-----------------------|---------|----------|------------|--------------------|
//! | `product`             | required| optional | forbidden  | forbidden          |
//! | `productWithDiscount` | required| optional | forbidden  | required           |
//! | `collection`          | forbidden| forbidden| required  | forbidden          |
//!
//! Client input arrives as a [`QrCodePayload`] (create) or a [`QrCodePatch`]
//! (update). Both normalize their strings and produce validated
//! [`QrCodeFields`]; a patch is validated against the merged record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{Destination, QrCodeId, ShopDomain};

/// Validation errors for QR code input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QrCodeError {
    /// The title is missing or blank.
    #[error("title is required")]
    MissingTitle,
    /// The destination is missing.
    #[error("destination is required")]
    MissingDestination,
    /// A field required by the destination is missing.
    #[error("{field} is required when destination is {destination}")]
    MissingField {
        /// Wire name of the missing field.
        field: &'static str,
        /// The record's destination.
        destination: Destination,
    },
    /// A field not allowed for the destination is present.
    #[error("{field} is not allowed when destination is {destination}")]
    ForbiddenField {
        /// Wire name of the forbidden field.
        field: &'static str,
        /// The record's destination.
        destination: Destination,
    },
}

/// A persisted QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    /// Unique ID, assigned by the store.
    pub id: QrCodeId,
    /// Owning shop. Set once at creation from the session.
    pub shop_domain: ShopDomain,
    /// Display name.
    pub title: String,
    /// Shopify product ID.
    pub product_id: Option<String>,
    /// Shopify product variant ID.
    pub variant_id: Option<String>,
    /// Shopify collection ID.
    pub collection_id: Option<String>,
    /// What the code links to.
    pub destination: Destination,
    /// Shopify discount node ID.
    pub discount_id: Option<String>,
    /// Discount code as stored at the time of the last write.
    pub discount_code: Option<String>,
    /// Number of recorded scans.
    pub scans_count: i64,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl QrCode {
    /// The client-writable fields of this record.
    #[must_use]
    pub fn fields(&self) -> QrCodeFields {
        QrCodeFields {
            title: self.title.clone(),
            product_id: self.product_id.clone(),
            variant_id: self.variant_id.clone(),
            collection_id: self.collection_id.clone(),
            destination: self.destination,
            discount_id: self.discount_id.clone(),
            discount_code: self.discount_code.clone(),
        }
    }

    /// Whether the record belongs to the given shop.
    #[must_use]
    pub fn is_owned_by(&self, shop: &ShopDomain) -> bool {
        self.shop_domain == *shop
    }
}

/// The client-writable fields of a QR code.
///
/// Values produced by [`QrCodePayload::into_fields`] and
/// [`QrCodePatch::apply_to`] have already been normalized and validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrCodeFields {
    pub title: String,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub collection_id: Option<String>,
    pub destination: Destination,
    pub discount_id: Option<String>,
    pub discount_code: Option<String>,
}

impl QrCodeFields {
    /// Normalize strings and check the destination rules.
    ///
    /// # Errors
    ///
    /// Returns a [`QrCodeError`] if the title is blank or the target fields
    /// do not match the destination.
    pub fn validate(self) -> Result<Self, QrCodeError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(QrCodeError::MissingTitle);
        }

        let fields = Self {
            title,
            product_id: normalize(self.product_id),
            variant_id: normalize(self.variant_id),
            collection_id: normalize(self.collection_id),
            destination: self.destination,
            discount_id: normalize(self.discount_id),
            discount_code: normalize(self.discount_code),
        };

        let destination = fields.destination;
        let check = |field: &'static str, value: &Option<String>, rule: Rule| match (rule, value)
        {
            (Rule::Required, None) => Err(QrCodeError::MissingField { field, destination }),
            (Rule::Forbidden, Some(_)) => Err(QrCodeError::ForbiddenField { field, destination }),
            _ => Ok(()),
        };

        let (product, variant, collection, discount) = match destination {
            Destination::Product => (
                Rule::Required,
                Rule::Optional,
                Rule::Forbidden,
                Rule::Forbidden,
            ),
            Destination::ProductWithDiscount => (
                Rule::Required,
                Rule::Optional,
                Rule::Forbidden,
                Rule::Required,
            ),
            Destination::Collection => (
                Rule::Forbidden,
                Rule::Forbidden,
                Rule::Required,
                Rule::Forbidden,
            ),
        };

        check("productId", &fields.product_id, product)?;
        check("variantId", &fields.variant_id, variant)?;
        check("collectionId", &fields.collection_id, collection)?;
        check("discountId", &fields.discount_id, discount)?;
        check("discountCode", &fields.discount_code, discount)?;

        Ok(fields)
    }
}

#[derive(Clone, Copy)]
enum Rule {
    Required,
    Optional,
    Forbidden,
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Request body for creating a QR code.
///
/// Server-assigned fields (`id`, `shopDomain`, `scansCount`, `createdAt`)
/// are not part of the payload and are ignored if a client sends them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodePayload {
    pub title: Option<String>,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub collection_id: Option<String>,
    pub destination: Option<Destination>,
    pub discount_id: Option<String>,
    pub discount_code: Option<String>,
}

impl QrCodePayload {
    /// Validate the payload into writable fields.
    ///
    /// # Errors
    ///
    /// Returns a [`QrCodeError`] if a required field is missing or the
    /// destination rules are violated.
    pub fn into_fields(self) -> Result<QrCodeFields, QrCodeError> {
        QrCodeFields {
            title: self.title.ok_or(QrCodeError::MissingTitle)?,
            product_id: self.product_id,
            variant_id: self.variant_id,
            collection_id: self.collection_id,
            destination: self.destination.ok_or(QrCodeError::MissingDestination)?,
            discount_id: self.discount_id,
            discount_code: self.discount_code,
        }
        .validate()
    }
}

/// Request body for updating a QR code.
///
/// A field that is absent keeps its stored value. An optional field sent as
/// `null` is cleared. The merged record must still satisfy the destination
/// rules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodePatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub product_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub variant_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub collection_id: Option<Option<String>>,
    pub destination: Option<Destination>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub discount_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub discount_code: Option<Option<String>>,
}

impl QrCodePatch {
    /// Merge the patch over a stored record and validate the result.
    ///
    /// # Errors
    ///
    /// Returns a [`QrCodeError`] if the merged fields violate the
    /// destination rules.
    pub fn apply_to(self, current: &QrCode) -> Result<QrCodeFields, QrCodeError> {
        let base = current.fields();
        QrCodeFields {
            title: self.title.unwrap_or(base.title),
            product_id: self.product_id.unwrap_or(base.product_id),
            variant_id: self.variant_id.unwrap_or(base.variant_id),
            collection_id: self.collection_id.unwrap_or(base.collection_id),
            destination: self.destination.unwrap_or(base.destination),
            discount_id: self.discount_id.unwrap_or(base.discount_id),
            discount_code: self.discount_code.unwrap_or(base.discount_code),
        }
        .validate()
    }
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent field (`None`).
fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
