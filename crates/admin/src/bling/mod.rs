//! Bling ERP REST client.
//!
//! Keeps the storefront in step with the Bling order/inventory system:
//! reads orders and products, derives the dashboard's sales figures, and
//! pushes local stock changes back.
//!
//! # Architecture
//!
//! - [`credentials`] resolves a bearer credential through an ordered chain
//!   (static API key, stored OAuth token, refreshed OAuth token)
//! - [`client`] issues authenticated REST calls and maps failures to [`BlingError`]
//! - [`normalize`] maps Bling's unstable JSON shapes into `loja_core` records
//! - [`sales`] builds the dashboard [`SalesSnapshot`](loja_core::SalesSnapshot)
//! - [`products`] and [`stock`] handle catalog sync and stock propagation
//!
//! # Failure policy
//!
//! Synchronization is best effort. Dashboard metrics degrade to zero when
//! Bling is unreachable, stock updates report a boolean, and only explicit
//! operator actions (product sync, OAuth connection) surface errors.

pub mod auth;
pub mod client;
pub mod credentials;
pub mod normalize;
pub mod products;
pub mod sales;
pub mod stock;
pub mod store;

pub use auth::{Credential, OAuthCredential, StoredTokens};
pub use client::BlingClient;
pub use credentials::{ConnectionStatus, CredentialProvider, Strategy};
pub use products::ProductSink;
pub use sales::OrderQuery;
pub use store::{MemoryTokenStore, StoreError, TokenStore};

use thiserror::Error;

/// Settings key under which OAuth tokens are persisted.
pub const TOKENS_SETTING_KEY: &str = "bling_tokens";

/// Errors that can occur when interacting with the Bling API.
#[derive(Debug, Error)]
pub enum BlingError {
    /// Neither a static API key nor a usable OAuth token is available.
    #[error("Bling is not configured: set BLING_API_KEY or connect an OAuth account")]
    NotConfigured,

    /// The token endpoint rejected the refresh or authorization code.
    #[error("Bling authentication failed: {0}")]
    AuthFailed(String),

    /// Bling answered with a non-2xx status.
    #[error("Bling API error: HTTP {status} - {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error description extracted from the response body.
        message: String,
    },

    /// Network-level failure (DNS, TLS, timeout, connection reset).
    #[error("Bling transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A product ID that would not form a valid `/produtos/{id}` path.
    #[error("Invalid Bling product id: {0:?}")]
    InvalidProductId(String),

    /// A 2xx response whose body could not be parsed.
    #[error("Invalid Bling response: {0}")]
    InvalidResponse(String),

    /// The token side-channel store failed.
    #[error("Token store error: {0}")]
    Store(#[from] StoreError),
}

impl BlingError {
    /// HTTP status code, if Bling returned one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
