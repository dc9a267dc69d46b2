//! Offline shop session management.
//!
//! The API only serves shops that have a stored offline token; these
//! commands write and remove those rows directly.

use secrecy::SecretString;
use shop_qr_api::db::{self, PgShopSessionStore, RepositoryError};
use shop_qr_core::{ShopDomain, ShopDomainError};
use thiserror::Error;

use super::{MissingDatabaseUrl, database_url};

/// Errors that can occur during shop session operations.
#[derive(Debug, Error)]
pub enum ShopError {
    /// Required environment variable is missing.
    #[error(transparent)]
    MissingEnvVar(#[from] MissingDatabaseUrl),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Invalid shop domain.
    #[error("Invalid shop domain {0:?}: {1}")]
    InvalidShop(String, ShopDomainError),

    /// Empty access token.
    #[error("Access token cannot be empty")]
    EmptyToken,

    /// Nothing stored for the shop.
    #[error("No session stored for {0}")]
    NotFound(ShopDomain),
}

fn parse_shop(shop: &str) -> Result<ShopDomain, ShopError> {
    ShopDomain::parse(shop).map_err(|e| ShopError::InvalidShop(shop.to_owned(), e))
}

async fn connect() -> Result<PgShopSessionStore, ShopError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&url).await?;
    Ok(PgShopSessionStore::new(pool))
}

/// Store the offline token for a shop, replacing any existing one.
pub async fn add(shop: &str, token: String, scopes: &[String]) -> Result<(), ShopError> {
    let shop = parse_shop(shop)?;
    if token.trim().is_empty() {
        return Err(ShopError::EmptyToken);
    }

    let store = connect().await?;
    store
        .save(&shop, &SecretString::from(token), scopes)
        .await?;

    tracing::info!(%shop, scopes = scopes.len(), "Stored shop session");
    Ok(())
}

/// Remove the stored session for a shop.
pub async fn remove(shop: &str) -> Result<(), ShopError> {
    let shop = parse_shop(shop)?;
    let store = connect().await?;

    if !store.delete(&shop).await? {
        return Err(ShopError::NotFound(shop));
    }

    tracing::info!(%shop, "Removed shop session");
    Ok(())
}

/// Print every shop with a stored session.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), ShopError> {
    let store = connect().await?;
    let sessions = store.list().await?;

    if sessions.is_empty() {
        tracing::info!("No shop sessions stored");
        return Ok(());
    }

    for session in sessions {
        println!(
            "{}\t{}\t{}",
            session.shop,
            session.updated_at.to_rfc3339(),
            session.scopes.join(",")
        );
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shop_rejects_garbage() {
        assert!(matches!(
            parse_shop(""),
            Err(ShopError::InvalidShop(_, ShopDomainError::Empty))
        ));
    }

    #[test]
    fn test_parse_shop_accepts_myshopify_domain() {
        let shop = parse_shop("example.myshopify.com").unwrap();
        assert_eq!(shop.as_str(), "example.myshopify.com");
    }

    #[tokio::test]
    async fn test_add_rejects_blank_token_before_connecting() {
        let result = add("example.myshopify.com", "  ".to_owned(), &[]).await;
        assert!(matches!(result, Err(ShopError::EmptyToken)));
    }
}
