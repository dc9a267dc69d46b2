//! CLI command implementations.

pub mod migrate;
pub mod shop;

use secrecy::SecretString;
use thiserror::Error;

/// Reading the database URL from the environment failed.
#[derive(Debug, Error)]
#[error("Missing environment variable: QRCODES_DATABASE_URL (or DATABASE_URL)")]
pub struct MissingDatabaseUrl;

/// Load `.env` and return the database URL, preferring `QRCODES_DATABASE_URL`.
pub fn database_url() -> Result<SecretString, MissingDatabaseUrl> {
    dotenvy::dotenv().ok();

    std::env::var("QRCODES_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MissingDatabaseUrl)
}
