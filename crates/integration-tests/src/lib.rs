//! Integration test support for the Loja Bling client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p loja-integration-tests
//! ```
//!
//! Every test runs against a `wiremock` server standing in for both the
//! Bling REST API and its OAuth token endpoint; no network or database is
//! needed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use loja_admin::bling::{BlingClient, MemoryTokenStore, ProductSink, StoredTokens};
use loja_admin::config::{BlingConfig, BlingOAuthConfig};
use loja_admin::db::RepositoryError;
use loja_core::Product;
use secrecy::SecretString;
use tokio::sync::Mutex;
use wiremock::MockServer;

/// Path of the token endpoint on the mock server.
pub const TOKEN_PATH: &str = "/oauth/token";

/// A mock Bling plus the pieces needed to build clients against it.
pub struct BlingHarness {
    pub server: MockServer,
    pub store: Arc<MemoryTokenStore>,
}

impl BlingHarness {
    /// Start a mock server with an empty token store.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            store: Arc::new(MemoryTokenStore::new()),
        }
    }

    /// Start a mock server whose token store already holds `tokens`.
    pub async fn with_tokens(tokens: StoredTokens) -> Self {
        Self {
            server: MockServer::start().await,
            store: Arc::new(MemoryTokenStore::with_tokens(tokens)),
        }
    }

    /// Configuration pointing at the mock server, without credentials.
    #[must_use]
    pub fn config(&self) -> BlingConfig {
        BlingConfig {
            api_base_url: self.server.uri(),
            token_url: format!("{}{TOKEN_PATH}", self.server.uri()),
            ..BlingConfig::default()
        }
    }

    /// Client authenticating with a static API key.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn static_key_client(&self, key: &str) -> BlingClient {
        let config = BlingConfig {
            api_key: Some(SecretString::from(key.to_string())),
            ..self.config()
        };
        BlingClient::new(&config, self.store.clone()).expect("client")
    }

    /// Client authenticating with OAuth app credentials and the stored tokens.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn oauth_client(&self) -> BlingClient {
        let config = BlingConfig {
            oauth: Some(oauth_app()),
            ..self.config()
        };
        BlingClient::new(&config, self.store.clone()).expect("client")
    }

    /// Client with a custom configuration, still pointed at the mock server.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn client_with(&self, config: &BlingConfig) -> BlingClient {
        BlingClient::new(config, self.store.clone()).expect("client")
    }
}

/// OAuth app credentials used by every test.
#[must_use]
pub fn oauth_app() -> BlingOAuthConfig {
    BlingOAuthConfig {
        client_id: "loja-test-client".to_string(),
        client_secret: SecretString::from("loja-test-secret"),
    }
}

/// Tokens issued at `issued_at` with Bling's usual six-hour lifetime.
#[must_use]
pub fn tokens_issued_at(access: &str, refresh: &str, issued_at: DateTime<Utc>) -> StoredTokens {
    StoredTokens::issued(
        access.to_string(),
        Some(refresh.to_string()),
        21_600,
        "Bearer".to_string(),
        issued_at,
    )
}

/// Tokens whose access token expired an hour ago.
#[must_use]
pub fn expired_tokens(access: &str, refresh: &str) -> StoredTokens {
    tokens_issued_at(access, refresh, Utc::now() - Duration::hours(7))
}

/// Product sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryProductSink {
    products: Mutex<Vec<Product>>,
}

impl MemoryProductSink {
    /// Products written so far, in write order.
    pub async fn products(&self) -> Vec<Product> {
        self.products.lock().await.clone()
    }
}

#[async_trait]
impl ProductSink for MemoryProductSink {
    async fn upsert(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut products = self.products.lock().await;
        products.retain(|existing| existing.external_id != product.external_id);
        products.push(product.clone());
        Ok(())
    }
}
