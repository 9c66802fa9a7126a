//! Bling OAuth token endpoint and credential types.
//!
//! Bling accepts either a long-lived API key or an OAuth access token, both
//! sent as `Authorization: Bearer`. OAuth access tokens last a few hours and
//! are renewed with a refresh token, which Bling may rotate on every refresh.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::BlingError;
use super::client::error_description;
use crate::config::BlingOAuthConfig;

/// Seconds of slack before `expires_at` at which a token counts as expired.
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Bling's access token lifetime, used when the token response omits it.
const DEFAULT_EXPIRES_IN: i64 = 21_600;

/// An access credential for the Bling API.
#[derive(Clone)]
pub enum Credential {
    /// Long-lived API key from configuration.
    StaticKey(SecretString),
    /// OAuth access token with its refresh token.
    OAuth(OAuthCredential),
}

/// OAuth access/refresh pair.
#[derive(Clone)]
pub struct OAuthCredential {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Value for the bearer `Authorization` header.
    #[must_use]
    pub const fn bearer(&self) -> &SecretString {
        match self {
            Self::StaticKey(key) => key,
            Self::OAuth(oauth) => &oauth.access_token,
        }
    }

    /// Whether this credential came from the static API key.
    #[must_use]
    pub const fn is_static_key(&self) -> bool {
        matches!(self, Self::StaticKey(_))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StaticKey(_) => f.debug_tuple("StaticKey").field(&"[REDACTED]").finish(),
            Self::OAuth(oauth) => f
                .debug_struct("OAuth")
                .field("access_token", &"[REDACTED]")
                .field(
                    "refresh_token",
                    &oauth.refresh_token.as_ref().map(|_| "[REDACTED]"),
                )
                .field("expires_at", &oauth.expires_at)
                .finish(),
        }
    }
}

/// Token record persisted under the `bling_tokens` settings key.
///
/// Implements `Debug` manually to redact the tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds as reported by Bling.
    pub expires_in: i64,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl StoredTokens {
    /// Build a record for tokens issued at `issued_at`.
    #[must_use]
    pub fn issued(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        token_type: String,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            token_type,
            expires_at: issued_at + Duration::seconds(expires_in),
        }
    }

    /// Last instant the access token may be sent (60 seconds before expiry).
    #[must_use]
    pub fn usable_until(&self) -> DateTime<Utc> {
        self.expires_at - Duration::seconds(EXPIRY_SKEW_SECONDS)
    }

    /// Check if the access token has expired (with a 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.usable_until()
    }

    /// Convert into an in-memory credential.
    #[must_use]
    pub fn to_credential(&self) -> Credential {
        Credential::OAuth(OAuthCredential {
            access_token: SecretString::from(self.access_token.clone()),
            refresh_token: self.refresh_token.clone().map(SecretString::from),
            expires_at: self.expires_at,
        })
    }
}

/// Response from the Bling token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Exchange a refresh token for a new token pair.
///
/// If Bling does not rotate the refresh token, the old one is carried over.
///
/// # Errors
///
/// Returns `BlingError::AuthFailed` if the token endpoint rejects the refresh
/// token or cannot be reached.
#[instrument(skip(client, oauth, refresh_token), fields(client_id = %oauth.client_id))]
pub async fn refresh_access_token(
    client: &reqwest::Client,
    token_url: &str,
    oauth: &BlingOAuthConfig,
    refresh_token: &SecretString,
) -> Result<StoredTokens, BlingError> {
    let mut tokens = request_tokens(
        client,
        token_url,
        oauth,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.expose_secret()),
        ],
    )
    .await?;

    if tokens.refresh_token.is_none() {
        tokens.refresh_token = Some(refresh_token.expose_secret().to_string());
    }

    Ok(tokens)
}

/// Exchange an authorization code (from the Bling app consent screen) for
/// the first token pair.
///
/// # Errors
///
/// Returns `BlingError::AuthFailed` if the code is invalid or expired.
#[instrument(skip(client, oauth, code), fields(client_id = %oauth.client_id))]
pub async fn exchange_authorization_code(
    client: &reqwest::Client,
    token_url: &str,
    oauth: &BlingOAuthConfig,
    code: &str,
) -> Result<StoredTokens, BlingError> {
    request_tokens(
        client,
        token_url,
        oauth,
        &[("grant_type", "authorization_code"), ("code", code)],
    )
    .await
}

async fn request_tokens(
    client: &reqwest::Client,
    token_url: &str,
    oauth: &BlingOAuthConfig,
    form: &[(&str, &str)],
) -> Result<StoredTokens, BlingError> {
    let issued_at = Utc::now();

    let response = client
        .post(token_url)
        .basic_auth(&oauth.client_id, Some(oauth.client_secret.expose_secret()))
        .header(reqwest::header::ACCEPT, "1.0")
        .form(form)
        .send()
        .await
        .map_err(|e| BlingError::AuthFailed(format!("token endpoint unreachable: {e}")))?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(BlingError::AuthFailed(format!(
            "HTTP {status}: {}",
            error_description(&body)
        )));
    }

    let token: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| BlingError::AuthFailed(format!("unexpected token response ({e}): {body}")))?;

    Ok(StoredTokens::issued(
        token.access_token,
        token.refresh_token,
        token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        token.token_type.unwrap_or_else(|| "Bearer".to_string()),
        issued_at,
    ))
}
