//! Loja CLI - Database migrations and Bling operations.
//!
//! # Usage
//!
//! ```bash
//! # Run admin database migrations
//! loja-cli migrate
//!
//! # Show Bling connection state
//! loja-cli bling status
//!
//! # Connect an OAuth account with the code from Bling's consent screen
//! loja-cli bling authorize <code>
//!
//! # Print today's sales snapshot
//! loja-cli bling snapshot
//!
//! # Copy the Bling catalog into the products table
//! loja-cli bling sync-products --only-with-stock
//!
//! # Push a stock quantity to Bling
//! loja-cli bling update-stock 16012345678 12
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "loja-cli")]
#[command(author, version, about = "Loja CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run admin database migrations
    Migrate,
    /// Bling ERP operations
    Bling {
        #[command(subcommand)]
        action: BlingAction,
    },
}

#[derive(Subcommand)]
enum BlingAction {
    /// Show the credential/connection state
    Status,
    /// Exchange an OAuth authorization code and store the tokens
    Authorize {
        /// Code from Bling's app authorization redirect
        code: String,
    },
    /// Print today's sales snapshot as JSON
    Snapshot,
    /// Copy the Bling catalog into the products table
    SyncProducts {
        /// Skip products with zero stock
        #[arg(long)]
        only_with_stock: bool,
    },
    /// Fetch one product and print it as JSON
    Product {
        /// Bling product ID
        id: String,
    },
    /// Set a product's stock quantity in Bling
    UpdateStock {
        /// Bling product ID
        id: String,
        /// New quantity on hand
        quantity: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loja_cli=info,loja_admin=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::admin().await?,
        Commands::Bling { action } => {
            let ctx = commands::bling::BlingContext::from_env().await?;
            match action {
                BlingAction::Status => ctx.status().await?,
                BlingAction::Authorize { code } => ctx.authorize(&code).await?,
                BlingAction::Snapshot => ctx.snapshot().await?,
                BlingAction::SyncProducts { only_with_stock } => {
                    ctx.sync_products(only_with_stock).await?;
                }
                BlingAction::Product { id } => ctx.product(&id).await?,
                BlingAction::UpdateStock { id, quantity } => {
                    ctx.update_stock(&id, quantity).await?;
                }
            }
        }
    }
    Ok(())
}
