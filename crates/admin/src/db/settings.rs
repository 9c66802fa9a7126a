//! Settings database operations.
//!
//! Global key/value settings stored as JSONB. The Bling client keeps its
//! OAuth tokens here under [`TOKENS_SETTING_KEY`].

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use crate::bling::{StoreError, StoredTokens, TOKENS_SETTING_KEY, TokenStore};

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SettingsError> for StoreError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Database(e) => Self::Backend(e.to_string()),
            SettingsError::Serialization(e) => Self::Malformed(e),
        }
    }
}

/// Get a setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_setting(pool: &PgPool, key: &str) -> Result<Option<JsonValue>, SettingsError> {
    let result = sqlx::query_scalar::<_, JsonValue>(
        r"
        SELECT value FROM admin.settings
        WHERE key = $1
        ",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(result)
}

/// Set a setting value, replacing any previous one.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn set_setting(pool: &PgPool, key: &str, value: &JsonValue) -> Result<(), SettingsError> {
    sqlx::query(
        r"
        INSERT INTO admin.settings (key, value)
        VALUES ($1, $2)
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
        ",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// [`TokenStore`] backed by the `admin.settings` table.
#[derive(Debug, Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgSettingsStore {
    async fn load(&self) -> Result<Option<StoredTokens>, StoreError> {
        let Some(value) = get_setting(&self.pool, TOKENS_SETTING_KEY).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn save(&self, tokens: &StoredTokens) -> Result<(), StoreError> {
        let value = serde_json::to_value(tokens)?;
        set_setting(&self.pool, TOKENS_SETTING_KEY, &value).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_error_maps_to_store_error() {
        let serde_err = serde_json::from_str::<StoredTokens>("{}").unwrap_err();
        let err: StoreError = SettingsError::Serialization(serde_err).into();
        assert!(matches!(err, StoreError::Malformed(_)));

        let err: StoreError = SettingsError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, StoreError::Backend(ref msg) if msg.contains("no rows")));
    }
}
