//! Stock propagation to Bling.
//!
//! Called after local stock changes (checkout, manual adjustment). Delivery
//! is best effort: there is no retry or outbox, the caller only learns
//! whether this attempt landed.

use serde_json::json;
use tracing::{info, instrument, warn};

use super::client::BlingClient;

impl BlingClient {
    /// Set the stock quantity of a Bling product.
    ///
    /// Returns `false` (and logs why) for an invalid ID or any failed
    /// request.
    #[instrument(skip(self))]
    pub async fn update_stock(&self, product_id: &str, quantity: i64) -> bool {
        if !validate_product_id(product_id) {
            warn!("Refusing stock update for invalid Bling product id");
            return false;
        }

        let body = json!({ "estoque": { "quantidade": quantity } });

        match self.put(&format!("/produtos/{product_id}"), &body).await {
            Ok(_) => {
                info!("Bling stock updated");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to update Bling stock");
                false
            }
        }
    }
}

/// Bling product IDs are numeric, SKUs are alphanumeric with `-`/`_`.
/// Anything else would alter the request path.
pub(crate) fn validate_product_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::bling::MemoryTokenStore;
    use crate::config::BlingConfig;

    fn client(server: &MockServer) -> BlingClient {
        let config = BlingConfig {
            api_key: Some(SecretString::from("static-key")),
            api_base_url: server.uri(),
            ..BlingConfig::default()
        };
        BlingClient::new(&config, Arc::new(MemoryTokenStore::new())).unwrap()
    }

    #[test]
    fn test_validate_product_id() {
        assert!(validate_product_id("16012345678"));
        assert!(validate_product_id("CAN-01_azul"));
        assert!(!validate_product_id(""));
        assert!(!validate_product_id("1/../pedidos"));
        assert!(!validate_product_id("1?x=2"));
    }

    #[tokio::test]
    async fn test_update_stock_sends_quantity() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/produtos/123"))
            .and(body_json(json!({"estoque": {"quantidade": 7}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": 123}})))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client(&server).update_stock("123", 7).await);
    }

    #[tokio::test]
    async fn test_update_stock_server_error_is_false() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/produtos/123"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        assert!(!client(&server).update_stock("123", 7).await);
    }

    #[tokio::test]
    async fn test_update_stock_not_configured_is_false() {
        let config = BlingConfig::default();
        let client = BlingClient::new(&config, Arc::new(MemoryTokenStore::new())).unwrap();
        assert!(!client.update_stock("123", 1).await);
    }
}
