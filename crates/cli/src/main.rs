//! Shop QR CLI - Database migrations and shop session management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sqr migrate
//!
//! # Store an offline Admin API token for a shop
//! sqr shop add --shop example.myshopify.com --token shpat_xxx --scopes read_products,write_script_tags
//!
//! # Forget a shop
//! sqr shop remove --shop example.myshopify.com
//!
//! # List installed shops
//! sqr shop list
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sqr")]
#[command(author, version, about = "Shop QR code CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage offline shop sessions
    Shop {
        #[command(subcommand)]
        action: ShopAction,
    },
}

#[derive(Subcommand)]
enum ShopAction {
    /// Store (or replace) the offline access token for a shop
    Add {
        /// Shop domain, e.g. `example.myshopify.com`
        #[arg(short, long)]
        shop: String,

        /// Offline Admin API access token
        #[arg(short, long)]
        token: String,

        /// Granted scopes
        #[arg(long, value_delimiter = ',')]
        scopes: Vec<String>,
    },
    /// Delete the stored session for a shop
    Remove {
        /// Shop domain
        #[arg(short, long)]
        shop: String,
    },
    /// List shops with a stored session
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Shop { action } => match action {
            ShopAction::Add {
                shop,
                token,
                scopes,
            } => commands::shop::add(&shop, token, &scopes).await?,
            ShopAction::Remove { shop } => commands::shop::remove(&shop).await?,
            ShopAction::List => commands::shop::list().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scopes_are_comma_separated() {
        let cli = Cli::try_parse_from([
            "sqr",
            "shop",
            "add",
            "--shop",
            "a.myshopify.com",
            "--token",
            "shpat_x",
            "--scopes",
            "read_products,write_script_tags",
        ]);
        let Ok(Cli {
            command:
                Commands::Shop {
                    action: ShopAction::Add { scopes, .. },
                },
        }) = cli
        else {
            panic!("expected shop add");
        };
        assert_eq!(scopes, vec!["read_products", "write_script_tags"]);
    }

    #[test]
    fn test_shop_remove_requires_shop() {
        assert!(Cli::try_parse_from(["sqr", "shop", "remove"]).is_err());
    }
}
