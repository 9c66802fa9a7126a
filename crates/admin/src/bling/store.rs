//! Side-channel storage for OAuth tokens.
//!
//! Tokens survive restarts by living in the `admin.settings` table (see
//! [`crate::db::settings::PgSettingsStore`]). The client only needs a blob
//! get/set, so the seam is this trait.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use super::auth::StoredTokens;

/// Errors from a [`TokenStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend failed (database down, permission denied).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The stored record does not have the expected shape.
    #[error("stored tokens are malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Key/value persistence for the `bling_tokens` record.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the stored token record, if one exists.
    async fn load(&self) -> Result<Option<StoredTokens>, StoreError>;

    /// Replace the stored token record.
    async fn save(&self, tokens: &StoredTokens) -> Result<(), StoreError>;
}

/// In-process token store.
///
/// Used when no database is attached (CLI one-offs, tests).
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<Option<StoredTokens>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with tokens.
    #[must_use]
    pub fn with_tokens(tokens: StoredTokens) -> Self {
        Self {
            tokens: RwLock::new(Some(tokens)),
        }
    }

    /// Current stored record.
    pub async fn current(&self) -> Option<StoredTokens> {
        self.tokens.read().await.clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<StoredTokens>, StoreError> {
        Ok(self.tokens.read().await.clone())
    }

    async fn save(&self, tokens: &StoredTokens) -> Result<(), StoreError> {
        *self.tokens.write().await = Some(tokens.clone());
        Ok(())
    }
}
