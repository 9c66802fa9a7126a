//! Authenticated REST transport for the Bling API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::BlingError;
use super::auth::StoredTokens;
use super::credentials::{ConnectionStatus, CredentialProvider};
use super::normalize::lookup;
use super::store::TokenStore;
use crate::config::{BlingConfig, SyncTuning};

/// Longest raw body quoted in an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Bling REST API client.
///
/// Cheap to clone; clones share the HTTP connection pool and the credential
/// cache.
#[derive(Clone)]
pub struct BlingClient {
    inner: Arc<BlingClientInner>,
}

struct BlingClientInner {
    http: reqwest::Client,
    base_url: String,
    credentials: CredentialProvider,
    tuning: SyncTuning,
}

impl std::fmt::Debug for BlingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlingClient")
            .field("base_url", &self.inner.base_url)
            .field("credentials", &self.inner.credentials)
            .field("tuning", &self.inner.tuning)
            .finish_non_exhaustive()
    }
}

impl BlingClient {
    /// Create a client from configuration.
    ///
    /// `store` holds the OAuth tokens between restarts.
    ///
    /// # Errors
    ///
    /// Returns `BlingError::Transport` if the HTTP client cannot be built.
    pub fn new(config: &BlingConfig, store: Arc<dyn TokenStore>) -> Result<Self, BlingError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let credentials = CredentialProvider::new(
            http.clone(),
            config.token_url.clone(),
            config.api_key.clone(),
            config.oauth.clone(),
            store,
        );

        Ok(Self {
            inner: Arc::new(BlingClientInner {
                http,
                base_url: config.api_base_url.trim_end_matches('/').to_string(),
                credentials,
                tuning: config.tuning,
            }),
        })
    }

    /// Credential provider shared by every request.
    #[must_use]
    pub fn credentials(&self) -> &CredentialProvider {
        &self.inner.credentials
    }

    /// Aggregation and sync tuning.
    #[must_use]
    pub fn tuning(&self) -> SyncTuning {
        self.inner.tuning
    }

    /// Report the connection state without contacting Bling.
    pub async fn connection_status(&self) -> ConnectionStatus {
        self.inner.credentials.connection_status().await
    }

    /// Complete the OAuth connection with an authorization code.
    ///
    /// # Errors
    ///
    /// See [`CredentialProvider::connect_with_code`].
    pub async fn connect_with_code(&self, code: &str) -> Result<StoredTokens, BlingError> {
        self.inner.credentials.connect_with_code(code).await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// Issue an authenticated request and parse the JSON response.
    ///
    /// An empty 2xx body yields `Value::Null`. A 401 drops the cached
    /// credential so the next request resolves a fresh one.
    ///
    /// # Errors
    ///
    /// Returns `BlingError::NotConfigured`/`AuthFailed` if no credential can
    /// be resolved, `BlingError::Http` for non-2xx statuses,
    /// `BlingError::Transport` for network failures, and
    /// `BlingError::InvalidResponse` if a 2xx body is not JSON.
    #[instrument(skip(self, query, body))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, BlingError> {
        let credential = self.inner.credentials.get_credential().await?;
        let url = format!("{}{path}", self.inner.base_url);

        let mut request = self
            .inner
            .http
            .request(method, &url)
            .bearer_auth(credential.bearer().expose_secret())
            .header(reqwest::header::ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                warn!(path, "Bling rejected the credential, clearing cache");
                self.inner.credentials.invalidate().await;
            }
            return Err(BlingError::Http {
                status: status.as_u16(),
                message: error_description(&text),
            });
        }

        debug!(path, status = %status, bytes = text.len(), "Bling response");

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| BlingError::InvalidResponse(format!("{e}: {}", truncate(&text))))
    }

    /// `GET` helper.
    ///
    /// # Errors
    ///
    /// See [`BlingClient::request`].
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, BlingError> {
        self.request(Method::GET, path, query, None).await
    }

    /// `PUT` helper with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`BlingClient::request`].
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, BlingError> {
        self.request(Method::PUT, path, &[], Some(body)).await
    }
}

/// Human-readable message from a Bling error body.
///
/// Bling v3 wraps errors as `{"error": {"type", "message", "description"}}`;
/// the token endpoint uses the OAuth `error_description` form. Anything else
/// is quoted raw.
pub(crate) fn error_description(body: &str) -> String {
    const PATHS: &[&str] = &[
        "error.description",
        "error.message",
        "error_description",
        "message",
        "error",
    ];

    if let Ok(json) = serde_json::from_str::<Value>(body)
        && let Some(message) = PATHS
            .iter()
            .filter_map(|path| lookup(&json, path))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|message| !message.is_empty())
    {
        return message.to_string();
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        truncate(trimmed)
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{head}...")
    }
}
