//! Shop domain type (the tenant identity).

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("shop domain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character that is not valid in a hostname.
    #[error("shop domain contains invalid character {0:?}")]
    InvalidCharacter(char),
    /// The input is not a dotted hostname.
    #[error("shop domain must be a hostname like your-store.myshopify.com")]
    NotAHostname,
}

/// A shop's domain, used as the tenant identifier.
///
/// Always stored lowercase. The domain is derived from the authenticated
/// session and never accepted from request bodies.
///
/// ## Constraints
///
/// - Length: 1-255 characters
/// - ASCII letters, digits, `-` and `.` only
/// - At least two labels, none empty, none starting or ending with `-`
///
/// ## Examples
///
/// ```
/// use shop_qr_core::ShopDomain;
///
/// assert!(ShopDomain::parse("your-store.myshopify.com").is_ok());
/// assert!(ShopDomain::parse("shop1.example").is_ok());
///
/// assert!(ShopDomain::parse("").is_err());
/// assert!(ShopDomain::parse("localhost").is_err());
/// assert!(ShopDomain::parse("https://shop.example").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Maximum length of a hostname.
    pub const MAX_LENGTH: usize = 255;

    /// Parse a `ShopDomain` from a string, lowercasing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, contains characters
    /// outside `[a-z0-9.-]`, or is not a multi-label hostname.
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(ShopDomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let lower = s.to_ascii_lowercase();

        if let Some(c) = lower
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
        {
            return Err(ShopDomainError::InvalidCharacter(c));
        }

        let labels: Vec<&str> = lower.split('.').collect();
        if labels.len() < 2
            || labels
                .iter()
                .any(|l| l.is_empty() || l.starts_with('-') || l.ends_with('-'))
        {
            return Err(ShopDomainError::NotAHostname);
        }

        Ok(Self(lower))
    }

    /// Returns the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ShopDomain` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = ShopDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(shop: ShopDomain) -> Self {
        shop.0
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ShopDomain {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ShopDomain {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ShopDomain {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_domains() {
        assert!(ShopDomain::parse("your-store.myshopify.com").is_ok());
        assert!(ShopDomain::parse("shop1.example").is_ok());
        assert!(ShopDomain::parse("a.b").is_ok());
    }

    #[test]
    fn test_parse_lowercases_and_trims() {
        let shop = ShopDomain::parse("  My-Store.MyShopify.com ").unwrap();
        assert_eq!(shop.as_str(), "my-store.myshopify.com");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ShopDomain::parse("   "), Err(ShopDomainError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}.com", "a".repeat(255));
        assert!(matches!(
            ShopDomain::parse(&long),
            Err(ShopDomainError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_scheme_and_path() {
        assert_eq!(
            ShopDomain::parse("https://shop.example"),
            Err(ShopDomainError::InvalidCharacter(':'))
        );
        assert_eq!(
            ShopDomain::parse("shop.example/admin"),
            Err(ShopDomainError::InvalidCharacter('/'))
        );
    }

    #[test]
    fn test_parse_rejects_bad_labels() {
        assert_eq!(
            ShopDomain::parse("localhost"),
            Err(ShopDomainError::NotAHostname)
        );
        assert_eq!(
            ShopDomain::parse("shop..example"),
            Err(ShopDomainError::NotAHostname)
        );
        assert_eq!(
            ShopDomain::parse("-shop.example"),
            Err(ShopDomainError::NotAHostname)
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let shop: ShopDomain = serde_json::from_str("\"Shop1.Example\"").unwrap();
        assert_eq!(shop.as_str(), "shop1.example");
        assert!(serde_json::from_str::<ShopDomain>("\"not a shop\"").is_err());
    }

    #[test]
    fn test_display() {
        let shop = ShopDomain::parse("shop1.example").unwrap();
        assert_eq!(format!("{shop}"), "shop1.example");
    }
}
