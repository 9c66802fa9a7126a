//! Bling operator commands.
//!
//! # Environment Variables
//!
//! - `BLING_API_KEY` or `BLING_CLIENT_ID`/`BLING_CLIENT_SECRET` - credentials
//!   (see `loja_admin::config` for the full list)
//! - `ADMIN_DATABASE_URL` - where OAuth tokens and synced products are kept.
//!   Without it, tokens live only for the duration of the command.

use std::sync::Arc;

use loja_admin::bling::{BlingClient, BlingError, MemoryTokenStore, TokenStore};
use loja_admin::config::{BlingConfig, ConfigError};
use loja_admin::db::{self, PgProductRepository, PgSettingsStore};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use super::migrate::database_url;

/// Errors that can occur while running Bling commands.
#[derive(Debug, Error)]
pub enum BlingCommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bling(#[from] BlingError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} requires ADMIN_DATABASE_URL")]
    DatabaseRequired(&'static str),

    #[error("Bling did not accept the stock update for product {0}")]
    StockRejected(String),
}

/// A Bling client plus the optional database behind it.
pub struct BlingContext {
    client: BlingClient,
    pool: Option<PgPool>,
}

impl BlingContext {
    /// Build the client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `BlingCommandError` if configuration is invalid or the
    /// database cannot be reached.
    pub async fn from_env() -> Result<Self, BlingCommandError> {
        dotenvy::dotenv().ok();

        let config = BlingConfig::from_env()?;

        let pool = match database_url() {
            Some(url) => Some(db::create_pool(&SecretString::from(url)).await?),
            None => {
                tracing::warn!("ADMIN_DATABASE_URL not set, OAuth tokens will not be persisted");
                None
            }
        };

        let store: Arc<dyn TokenStore> = match &pool {
            Some(pool) => Arc::new(PgSettingsStore::new(pool.clone())),
            None => Arc::new(MemoryTokenStore::new()),
        };

        Ok(Self {
            client: BlingClient::new(&config, store)?,
            pool,
        })
    }

    /// Print the connection state.
    ///
    /// # Errors
    ///
    /// Returns `BlingCommandError::Json` if the status cannot be serialized.
    pub async fn status(&self) -> Result<(), BlingCommandError> {
        let status = self.client.connection_status().await;
        print_json(&status)
    }

    /// Exchange an authorization code and store the tokens.
    ///
    /// # Errors
    ///
    /// Returns `BlingCommandError::DatabaseRequired` without a database, or
    /// the Bling error if the exchange fails.
    pub async fn authorize(&self, code: &str) -> Result<(), BlingCommandError> {
        if self.pool.is_none() {
            return Err(BlingCommandError::DatabaseRequired("bling authorize"));
        }

        let tokens = self.client.connect_with_code(code.trim()).await?;

        #[allow(clippy::print_stdout)]
        {
            println!("Connected. Access token valid until {}", tokens.expires_at);
        }
        Ok(())
    }

    /// Print today's sales snapshot.
    ///
    /// # Errors
    ///
    /// Returns `BlingCommandError::Json` if the snapshot cannot be serialized.
    pub async fn snapshot(&self) -> Result<(), BlingCommandError> {
        let snapshot = self.client.get_sales_snapshot().await;
        print_json(&snapshot)
    }

    /// Copy the catalog into the products table.
    ///
    /// # Errors
    ///
    /// Returns `BlingCommandError::DatabaseRequired` without a database, or
    /// the Bling error if the product list cannot be fetched.
    pub async fn sync_products(&self, only_with_stock: bool) -> Result<(), BlingCommandError> {
        let pool = self
            .pool
            .clone()
            .ok_or(BlingCommandError::DatabaseRequired("bling sync-products"))?;
        let repository = PgProductRepository::new(pool);

        let upserted = self
            .client
            .sync_products(&repository, only_with_stock)
            .await?;

        #[allow(clippy::print_stdout)]
        {
            println!("Synced {upserted} products");
        }
        Ok(())
    }

    /// Print one product.
    ///
    /// # Errors
    ///
    /// Returns the Bling error if the product cannot be fetched.
    pub async fn product(&self, id: &str) -> Result<(), BlingCommandError> {
        let product = self.client.get_product(id).await?;
        print_json(&product)
    }

    /// Set a product's stock quantity.
    ///
    /// # Errors
    ///
    /// Returns `BlingCommandError::StockRejected` if Bling did not accept it.
    pub async fn update_stock(&self, id: &str, quantity: i64) -> Result<(), BlingCommandError> {
        if !self.client.update_stock(id, quantity).await {
            return Err(BlingCommandError::StockRejected(id.to_string()));
        }

        #[allow(clippy::print_stdout)]
        {
            println!("Stock for {id} set to {quantity}");
        }
        Ok(())
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), BlingCommandError> {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}
