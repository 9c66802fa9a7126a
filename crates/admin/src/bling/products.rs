//! Catalog sync from Bling into the local product table.

use async_trait::async_trait;
use loja_core::Product;
use tracing::{info, instrument, warn};

use super::client::BlingClient;
use super::normalize::{normalize_product, normalize_products, single};
use super::stock::validate_product_id;
use super::BlingError;
use crate::db::RepositoryError;

const PRODUCTS_PATH: &str = "/produtos";

/// Destination for synchronized products.
#[async_trait]
pub trait ProductSink: Send + Sync {
    /// Insert the product or update the row with the same `external_id`.
    async fn upsert(&self, product: &Product) -> Result<(), RepositoryError>;
}

impl BlingClient {
    /// Fetch the product list.
    ///
    /// Tries `GET /produtos?limite=N` first and falls back to the bare
    /// `GET /produtos` if Bling rejects the paged request.
    ///
    /// # Errors
    ///
    /// Returns the fallback request's error if both requests fail.
    #[instrument(skip(self))]
    pub async fn list_products(&self, limit: usize) -> Result<Vec<Product>, BlingError> {
        let payload = match self
            .get(PRODUCTS_PATH, &[("limite", limit.to_string())])
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Paged product list failed, retrying without limit");
                self.get(PRODUCTS_PATH, &[]).await?
            }
        };

        Ok(normalize_products(&payload))
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns `BlingError::InvalidProductId` if `id` is not a valid Bling ID,
    /// `BlingError::InvalidResponse` if the response holds no product record,
    /// and `BlingError` if the request fails.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &str) -> Result<Product, BlingError> {
        if !validate_product_id(id) {
            return Err(BlingError::InvalidProductId(id.to_string()));
        }

        let payload = self.get(&format!("{PRODUCTS_PATH}/{id}"), &[]).await?;

        single(&payload)
            .map(normalize_product)
            .ok_or_else(|| BlingError::InvalidResponse(format!("no product record for id {id}")))
    }

    /// Copy Bling's catalog into `sink`.
    ///
    /// Products without an ID are skipped, as are products with no stock when
    /// `only_with_stock` is set. A product the sink rejects is logged and
    /// skipped. Returns the number of products written.
    ///
    /// # Errors
    ///
    /// Returns `BlingError` if the product list cannot be fetched at all.
    #[instrument(skip(self, sink))]
    pub async fn sync_products(
        &self,
        sink: &dyn ProductSink,
        only_with_stock: bool,
    ) -> Result<usize, BlingError> {
        let products = self.list_products(self.tuning().products_limit).await?;
        let fetched = products.len();

        let mut upserted = 0;
        for product in products
            .iter()
            .filter(|product| !product.external_id.is_empty())
            .filter(|product| !only_with_stock || product.in_stock())
        {
            match sink.upsert(product).await {
                Ok(()) => upserted += 1,
                Err(e) => warn!(
                    external_id = %product.external_id,
                    error = %e,
                    "Failed to upsert product, skipping"
                ),
            }
        }

        info!(fetched, upserted, only_with_stock, "Bling product sync finished");
        Ok(upserted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use serde_json::json;
    use tokio::sync::Mutex;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::bling::MemoryTokenStore;
    use crate::config::BlingConfig;

    #[derive(Default)]
    struct RecordingSink {
        products: Mutex<Vec<Product>>,
        reject: Option<&'static str>,
    }

    #[async_trait]
    impl ProductSink for RecordingSink {
        async fn upsert(&self, product: &Product) -> Result<(), RepositoryError> {
            if self.reject == Some(product.external_id.as_str()) {
                return Err(RepositoryError::Conflict("rejected".to_string()));
            }
            self.products.lock().await.push(product.clone());
            Ok(())
        }
    }

    fn client(server: &MockServer) -> BlingClient {
        let config = BlingConfig {
            api_key: Some(SecretString::from("static-key")),
            api_base_url: server.uri(),
            ..BlingConfig::default()
        };
        BlingClient::new(&config, Arc::new(MemoryTokenStore::new())).unwrap()
    }

    fn catalog() -> serde_json::Value {
        json!({"data": [
            {"id": 1, "nome": "Caneca", "preco": 29.9, "estoque": {"quantidade": 4}},
            {"id": 2, "nome": "Camiseta", "preco": "59,90", "estoque": 0},
            {"nome": "Sem ID", "preco": 1}
        ]})
    }

    #[tokio::test]
    async fn test_sync_only_with_stock() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/produtos"))
            .and(query_param("limite", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(catalog()))
            .mount(&server)
            .await;

        let sink = RecordingSink::default();
        let upserted = client(&server).sync_products(&sink, true).await.unwrap();

        assert_eq!(upserted, 1);
        let products = sink.products.lock().await;
        assert_eq!(products[0].external_id, "1");
        assert_eq!(products[0].current_stock, 4);
    }

    #[tokio::test]
    async fn test_sync_falls_back_to_unpaged_list_and_skips_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/produtos"))
            .and(query_param("limite", "100"))
            .respond_with(ResponseTemplate::new(400).set_body_string("limite invalido"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/produtos"))
            .and(query_param_is_missing("limite"))
            .respond_with(ResponseTemplate::new(200).set_body_json(catalog()))
            .expect(1)
            .mount(&server)
            .await;

        let sink = RecordingSink {
            reject: Some("2"),
            ..RecordingSink::default()
        };
        let upserted = client(&server).sync_products(&sink, false).await.unwrap();

        assert_eq!(upserted, 1);
        assert_eq!(sink.products.lock().await[0].name, "Caneca");
    }

    #[tokio::test]
    async fn test_sync_fails_when_both_lists_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/produtos"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let sink = RecordingSink::default();
        let err = client(&server).sync_products(&sink, false).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(sink.products.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_product_unwraps_data_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/produtos/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": 42, "nome": "Caneca", "codigo": "CAN-01", "preco": 29.9}
            })))
            .mount(&server)
            .await;

        let product = client(&server).get_product("42").await.unwrap();
        assert_eq!(product.external_id, "42");
        assert_eq!(product.sku, "CAN-01");
        assert_eq!(product.price, Decimal::new(299, 1));
    }

    #[tokio::test]
    async fn test_get_product_rejects_path_injection() {
        let server = MockServer::start().await;
        let err = client(&server).get_product("../pedidos").await.unwrap_err();
        assert!(matches!(err, BlingError::InvalidProductId(ref id) if id == "../pedidos"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
