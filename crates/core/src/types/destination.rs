//! Where a scanned QR code sends the customer.

use core::fmt;

use serde::{Deserialize, Serialize};

/// QR code destination.
///
/// Determines which target fields a QR code must carry and how its
/// destination URL is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "qr_destination", rename_all = "camelCase")
)]
#[serde(rename_all = "camelCase")]
pub enum Destination {
    /// A product page.
    Product,
    /// A product page with a discount code applied.
    ProductWithDiscount,
    /// A collection page.
    Collection,
}

impl Destination {
    /// Whether this destination targets a product.
    #[must_use]
    pub const fn targets_product(self) -> bool {
        matches!(self, Self::Product | Self::ProductWithDiscount)
    }

    /// Whether this destination requires a discount.
    #[must_use]
    pub const fn requires_discount(self) -> bool {
        matches!(self, Self::ProductWithDiscount)
    }

    /// The wire name of the destination.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::ProductWithDiscount => "productWithDiscount",
            Self::Collection => "collection",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        for destination in [
            Destination::Product,
            Destination::ProductWithDiscount,
            Destination::Collection,
        ] {
            let json = serde_json::to_string(&destination).unwrap();
            assert_eq!(json, format!("\"{}\"", destination.as_str()));
        }
    }

    #[test]
    fn test_rejects_unknown_destination() {
        assert!(serde_json::from_str::<Destination>("\"checkout\"").is_err());
    }

    #[test]
    fn test_requirements() {
        assert!(Destination::ProductWithDiscount.requires_discount());
        assert!(!Destination::Product.requires_discount());
        assert!(Destination::Product.targets_product());
        assert!(!Destination::Collection.targets_product());
    }
}
