//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Liveness check
//!
//! # Dashboard
//! GET  /api/dashboard/stats          - Today's sales, new orders, recent orders
//!
//! # Products (Bling catalog)
//! POST /api/products/sync            - Copy the Bling catalog into the products table
//! GET  /api/products/{id}            - Fetch one product from Bling
//! PUT  /api/products/{id}/stock      - Push a stock quantity to Bling
//!
//! # Bling connection
//! GET  /api/bling/status             - Credential/connection state
//! POST /api/bling/authorize          - Exchange an OAuth authorization code
//! ```

pub mod bling;
pub mod dashboard;
pub mod products;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the complete admin router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(dashboard::router())
        .merge(products::router())
        .merge(bling::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, Response};
    use loja_core::Product;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use crate::bling::{BlingClient, MemoryTokenStore, ProductSink};
    use crate::config::BlingConfig;
    use crate::db::RepositoryError;
    use crate::state::AppState;

    #[derive(Default)]
    pub struct MemorySink {
        pub products: Mutex<Vec<Product>>,
    }

    #[async_trait]
    impl ProductSink for MemorySink {
        async fn upsert(&self, product: &Product) -> Result<(), RepositoryError> {
            self.products.lock().await.push(product.clone());
            Ok(())
        }
    }

    pub fn state(config: &BlingConfig) -> AppState {
        let bling = BlingClient::new(config, Arc::new(MemoryTokenStore::new())).unwrap();
        AppState::new(bling, Arc::new(MemorySink::default()))
    }

    pub async fn send(state: AppState, request: Request<Body>) -> Response<Body> {
        super::routes()
            .with_state(state)
            .oneshot(request)
            .await
            .unwrap()
    }

    pub async fn json_body(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
