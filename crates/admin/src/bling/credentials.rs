//! Credential resolution for the Bling client.
//!
//! Credentials are resolved through an ordered strategy chain and cached in
//! memory until they expire. Resolution is single-flight: concurrent callers
//! that find the cache empty or expired wait for one resolution instead of
//! each refreshing the OAuth token.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use super::BlingError;
use super::auth::{Credential, StoredTokens, exchange_authorization_code, refresh_access_token};
use super::store::TokenStore;
use crate::config::BlingOAuthConfig;

/// Static keys do not expire; they are re-validated against configuration
/// once a year of process uptime.
const STATIC_KEY_TTL_DAYS: i64 = 365;

/// Ways to obtain a credential, tried in [`Strategy::CHAIN`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `BLING_API_KEY` from configuration.
    StaticKey,
    /// Unexpired access token from the settings store.
    StoredOAuth,
    /// Refresh-token exchange against the token endpoint.
    RefreshedOAuth,
}

impl Strategy {
    /// Resolution order. The first strategy that yields a credential wins.
    pub const CHAIN: [Self; 3] = [Self::StaticKey, Self::StoredOAuth, Self::RefreshedOAuth];
}

/// Where the Bling integration stands, for settings and status screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No API key and no stored OAuth tokens.
    NotConfigured,
    /// Using the static API key.
    StaticKey,
    /// OAuth access token valid until `expires_at`.
    Connected { expires_at: DateTime<Utc> },
    /// OAuth access token expired; `refreshable` when a refresh will be attempted.
    TokenExpired { refreshable: bool },
}

struct CacheEntry {
    credential: Credential,
    valid_until: DateTime<Utc>,
}

impl CacheEntry {
    fn static_key(key: &SecretString) -> Self {
        Self {
            credential: Credential::StaticKey(key.clone()),
            valid_until: Utc::now() + Duration::days(STATIC_KEY_TTL_DAYS),
        }
    }

    fn oauth(tokens: &StoredTokens) -> Self {
        Self {
            credential: tokens.to_credential(),
            valid_until: tokens.usable_until(),
        }
    }

    fn is_fresh(&self) -> bool {
        Utc::now() < self.valid_until
    }
}

/// Resolves and caches the credential used for every Bling request.
///
/// Owned by [`BlingClient`](super::BlingClient); there is no process-global
/// token state.
pub struct CredentialProvider {
    http: reqwest::Client,
    token_url: String,
    api_key: Option<SecretString>,
    oauth: Option<BlingOAuthConfig>,
    store: Arc<dyn TokenStore>,
    cache: RwLock<Option<CacheEntry>>,
    /// Held while resolving so only one caller refreshes at a time.
    resolving: Mutex<()>,
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("token_url", &self.token_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("oauth", &self.oauth)
            .finish_non_exhaustive()
    }
}

impl CredentialProvider {
    /// Create a provider with an empty cache.
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        token_url: String,
        api_key: Option<SecretString>,
        oauth: Option<BlingOAuthConfig>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            http,
            token_url,
            api_key,
            oauth,
            store,
            cache: RwLock::new(None),
            resolving: Mutex::new(()),
        }
    }

    /// Get a usable credential.
    ///
    /// A fresh cached credential is returned without any I/O. Otherwise the
    /// strategy chain runs: static key, stored OAuth token, refreshed OAuth
    /// token.
    ///
    /// # Errors
    ///
    /// Returns `BlingError::NotConfigured` if no strategy applies.
    /// Returns `BlingError::AuthFailed` if a refresh was attempted and rejected;
    /// the cache is left untouched in that case.
    pub async fn get_credential(&self) -> Result<Credential, BlingError> {
        if let Some(credential) = self.cached().await {
            return Ok(credential);
        }

        let _resolving = self.resolving.lock().await;

        // Another caller may have finished resolving while we waited
        if let Some(credential) = self.cached().await {
            return Ok(credential);
        }

        self.resolve().await
    }

    /// Drop the cached credential so the next request re-resolves it.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Report the connection state without contacting Bling.
    pub async fn connection_status(&self) -> ConnectionStatus {
        if self.api_key.is_some() {
            return ConnectionStatus::StaticKey;
        }

        match self.load_stored().await {
            None => ConnectionStatus::NotConfigured,
            Some(tokens) if !tokens.is_expired() => ConnectionStatus::Connected {
                expires_at: tokens.expires_at,
            },
            Some(tokens) => ConnectionStatus::TokenExpired {
                refreshable: tokens.refresh_token.is_some() && self.oauth.is_some(),
            },
        }
    }

    /// Complete the OAuth connection with an authorization code and persist
    /// the resulting tokens.
    ///
    /// # Errors
    ///
    /// Returns `BlingError::NotConfigured` without OAuth client credentials,
    /// `BlingError::AuthFailed` if Bling rejects the code, and
    /// `BlingError::Store` if the tokens cannot be saved.
    #[instrument(skip(self, code))]
    pub async fn connect_with_code(&self, code: &str) -> Result<StoredTokens, BlingError> {
        let oauth = self.oauth.as_ref().ok_or(BlingError::NotConfigured)?;

        let tokens = exchange_authorization_code(&self.http, &self.token_url, oauth, code).await?;
        self.store.save(&tokens).await?;
        self.invalidate().await;

        info!(expires_at = %tokens.expires_at, "Bling OAuth account connected");
        Ok(tokens)
    }

    async fn cached(&self) -> Option<Credential> {
        self.cache
            .read()
            .await
            .as_ref()
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.credential.clone())
    }

    async fn resolve(&self) -> Result<Credential, BlingError> {
        // The stored record is loaded at most once per resolution
        let mut stored: Option<Option<StoredTokens>> = None;

        for strategy in Strategy::CHAIN {
            if let Some(entry) = self.attempt(strategy, &mut stored).await? {
                debug!(?strategy, valid_until = %entry.valid_until, "Bling credential resolved");
                let credential = entry.credential.clone();
                *self.cache.write().await = Some(entry);
                return Ok(credential);
            }
        }

        Err(BlingError::NotConfigured)
    }

    async fn attempt(
        &self,
        strategy: Strategy,
        stored: &mut Option<Option<StoredTokens>>,
    ) -> Result<Option<CacheEntry>, BlingError> {
        match strategy {
            Strategy::StaticKey => Ok(self.api_key.as_ref().map(CacheEntry::static_key)),
            Strategy::StoredOAuth => Ok(self
                .stored(stored)
                .await
                .filter(|tokens| !tokens.is_expired())
                .map(CacheEntry::oauth)),
            Strategy::RefreshedOAuth => {
                let Some(refresh_token) = self
                    .stored(stored)
                    .await
                    .and_then(|tokens| tokens.refresh_token.clone())
                else {
                    return Ok(None);
                };
                let Some(oauth) = self.oauth.as_ref() else {
                    warn!("Stored Bling refresh token found but BLING_CLIENT_ID/BLING_CLIENT_SECRET are not set");
                    return Ok(None);
                };

                let tokens = refresh_access_token(
                    &self.http,
                    &self.token_url,
                    oauth,
                    &SecretString::from(refresh_token),
                )
                .await?;

                if let Err(e) = self.store.save(&tokens).await {
                    warn!(error = %e, "Failed to persist refreshed Bling tokens; keeping them in memory");
                }
                info!(expires_at = %tokens.expires_at, "Bling access token refreshed");

                Ok(Some(CacheEntry::oauth(&tokens)))
            }
        }
    }

    async fn stored<'a>(
        &self,
        slot: &'a mut Option<Option<StoredTokens>>,
    ) -> Option<&'a StoredTokens> {
        if slot.is_none() {
            *slot = Some(self.load_stored().await);
        }
        slot.as_ref().and_then(Option::as_ref)
    }

    async fn load_stored(&self) -> Option<StoredTokens> {
        match self.store.load().await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Failed to load stored Bling tokens");
                None
            }
        }
    }
}
