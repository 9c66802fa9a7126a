//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (Bling ERP)
//! - `BLING_API_KEY` - Static API key; takes priority over OAuth when set
//! - `BLING_CLIENT_ID` - OAuth app client ID (needed to refresh tokens)
//! - `BLING_CLIENT_SECRET` - OAuth app client secret
//! - `BLING_API_BASE_URL` - API root (default: <https://www.bling.com.br/Api/v3>)
//! - `BLING_TOKEN_URL` - OAuth token endpoint (default: <https://bling.com.br/Api/v3/oauth/token>)
//! - `BLING_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `BLING_FALLBACK_THRESHOLD` - Date-filtered order count below which the
//!   recent-orders scan runs (default: 5)
//! - `BLING_ORDERS_LIMIT` - Page size for today's orders (default: 100)
//! - `BLING_RECENT_BATCH` - Size of the unfiltered recent-orders scan (default: 100)
//! - `BLING_RECENT_ORDERS` - Orders shown in the dashboard feed (default: 5)
//! - `BLING_PRODUCTS_LIMIT` - Page size for product sync (default: 100)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

pub const DEFAULT_BLING_API_BASE_URL: &str = "https://www.bling.com.br/Api/v3";
pub const DEFAULT_BLING_TOKEN_URL: &str = "https://bling.com.br/Api/v3/oauth/token";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bling ERP integration
    pub bling: BlingConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Bling ERP client configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BlingConfig {
    /// Static API key. When set, OAuth is never attempted.
    pub api_key: Option<SecretString>,
    /// OAuth app credentials, required to refresh stored tokens.
    pub oauth: Option<BlingOAuthConfig>,
    /// API root, without trailing slash.
    pub api_base_url: String,
    /// OAuth token endpoint.
    pub token_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Aggregation and sync tuning.
    pub tuning: SyncTuning,
}

impl std::fmt::Debug for BlingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlingConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("oauth", &self.oauth)
            .field("api_base_url", &self.api_base_url)
            .field("token_url", &self.token_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("tuning", &self.tuning)
            .finish()
    }
}

impl Default for BlingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            oauth: None,
            api_base_url: DEFAULT_BLING_API_BASE_URL.to_string(),
            token_url: DEFAULT_BLING_TOKEN_URL.to_string(),
            timeout_secs: 30,
            tuning: SyncTuning::default(),
        }
    }
}

/// Bling OAuth app credentials.
///
/// Implements `Debug` manually to redact the client secret.
#[derive(Clone)]
pub struct BlingOAuthConfig {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for BlingOAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlingOAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Knobs for order aggregation and product sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTuning {
    /// When the date-filtered order query returns fewer orders than this,
    /// Bling's date filter is assumed to have been ignored and a recent
    /// batch is scanned locally for today's orders.
    pub fallback_threshold: usize,
    /// `limit` for the date-filtered order query.
    pub orders_limit: usize,
    /// `limit` for the unfiltered recent-orders scan.
    pub recent_batch: usize,
    /// Length of the dashboard's recent-orders feed.
    pub recent_orders: usize,
    /// `limite` for the product list.
    pub products_limit: usize,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            fallback_threshold: 5,
            orders_limit: 100,
            recent_batch: 100,
            recent_orders: 5,
            products_limit: 100,
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ADMIN_DATABASE_URL")?;
        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_parsed_or_default("ADMIN_PORT", 3001_u16)?;
        let bling = BlingConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            bling,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl BlingConfig {
    /// Load the Bling section from environment variables.
    ///
    /// Every variable is optional; an unconfigured integration surfaces as
    /// `BlingError::NotConfigured` at request time.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if numeric settings do not parse or only one of
    /// `BLING_CLIENT_ID`/`BLING_CLIENT_SECRET` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = get_optional_env("BLING_API_KEY").map(|key| {
            if let Err(e) = validate_secret_strength(&key, "BLING_API_KEY") {
                tracing::warn!("BLING_API_KEY validation warning: {e}");
            }
            SecretString::from(key)
        });

        let defaults = SyncTuning::default();
        let tuning = SyncTuning {
            fallback_threshold: get_parsed_or_default(
                "BLING_FALLBACK_THRESHOLD",
                defaults.fallback_threshold,
            )?,
            orders_limit: get_parsed_or_default("BLING_ORDERS_LIMIT", defaults.orders_limit)?,
            recent_batch: get_parsed_or_default("BLING_RECENT_BATCH", defaults.recent_batch)?,
            recent_orders: get_parsed_or_default("BLING_RECENT_ORDERS", defaults.recent_orders)?,
            products_limit: get_parsed_or_default("BLING_PRODUCTS_LIMIT", defaults.products_limit)?,
        };

        Ok(Self {
            api_key,
            oauth: BlingOAuthConfig::from_env()?,
            api_base_url: get_env_or_default("BLING_API_BASE_URL", DEFAULT_BLING_API_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            token_url: get_env_or_default("BLING_TOKEN_URL", DEFAULT_BLING_TOKEN_URL),
            timeout_secs: get_parsed_or_default("BLING_TIMEOUT_SECS", 30_u64)?,
            tuning,
        })
    }
}

impl BlingOAuthConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let client_id = get_optional_env("BLING_CLIENT_ID");
        let client_secret = get_optional_env("BLING_CLIENT_SECRET");

        match (client_id, client_secret) {
            (Some(client_id), Some(secret)) => {
                if let Err(e) = validate_secret_strength(&secret, "BLING_CLIENT_SECRET") {
                    tracing::warn!("BLING_CLIENT_SECRET validation warning: {e}");
                }
                Ok(Some(Self {
                    client_id,
                    client_secret: SecretString::from(secret),
                }))
            }
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "BLING_CLIENT_*".to_string(),
                "Both BLING_CLIENT_ID and BLING_CLIENT_SECRET must be set together".to_string(),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable, falling back to `default`.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
