//! Product route handlers.
//!
//! The catalog lives in Bling. These endpoints pull it into the local
//! `products` table and push stock changes back.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use loja_core::Product;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::bling::BlingError;
use crate::error::AppError;
use crate::state::AppState;

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products/sync", post(sync))
        .route("/api/products/{id}", get(show))
        .route("/api/products/{id}/stock", put(update_stock))
}

// =============================================================================
// API Types
// =============================================================================

/// Request to sync the catalog.
#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    /// Skip products Bling reports with zero stock.
    #[serde(default)]
    pub only_with_stock: bool,
}

/// Result of a catalog sync.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub upserted: usize,
}

/// Request to set a product's stock in Bling.
#[derive(Debug, Deserialize)]
pub struct StockUpdateRequest {
    pub quantity: i64,
}

/// Whether Bling accepted the stock update.
#[derive(Debug, Serialize)]
pub struct StockUpdateResponse {
    pub success: bool,
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /api/products/sync - Copy the Bling catalog into the products table.
#[instrument(skip(state))]
async fn sync(
    State(state): State<AppState>,
    body: Option<Json<SyncRequest>>,
) -> Result<Json<SyncResponse>, AppError> {
    let Json(request) = body.unwrap_or_default();

    let upserted = state
        .bling()
        .sync_products(state.products(), request.only_with_stock)
        .await?;

    Ok(Json(SyncResponse { upserted }))
}

/// GET /api/products/{id} - Fetch one product from Bling.
#[instrument(skip(state))]
async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    match state.bling().get_product(&id).await {
        Ok(product) => Ok(Json(product)),
        Err(BlingError::Http { status: 404, .. }) => {
            Err(AppError::NotFound(format!("product {id}")))
        }
        Err(e) => Err(e.into()),
    }
}

/// PUT /api/products/{id}/stock - Push a stock quantity to Bling.
#[instrument(skip(state))]
async fn update_stock(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StockUpdateRequest>,
) -> Result<Json<StockUpdateResponse>, AppError> {
    if request.quantity < 0 {
        return Err(AppError::BadRequest(
            "quantity must not be negative".to_string(),
        ));
    }

    let success = state.bling().update_stock(&id, request.quantity).await;
    Ok(Json(StockUpdateResponse { success }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::config::BlingConfig;
    use crate::routes::test_support::{json_body, send, state};

    fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn configured(server: &MockServer) -> BlingConfig {
        BlingConfig {
            api_key: Some(SecretString::from("static-key")),
            api_base_url: server.uri(),
            ..BlingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_sync_without_bling_is_service_unavailable() {
        let response = send(
            state(&BlingConfig::default()),
            json_request("POST", "/api/products/sync", &json!({})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_sync_reports_upserted_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/produtos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
                {"id": 1, "nome": "Caneca", "preco": "29.90", "estoque": {"quantidade": 3}},
                {"id": 2, "nome": "Camiseta", "preco": "59.90", "estoque": {"quantidade": 0}}
            ]})))
            .mount(&server)
            .await;

        let response = send(
            state(&configured(&server)),
            json_request("POST", "/api/products/sync", &json!({"only_with_stock": true})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"upserted": 1}));
    }

    #[tokio::test]
    async fn test_sync_upstream_failure_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/produtos"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let response = send(
            state(&configured(&server)),
            json_request("POST", "/api/products/sync", &json!({})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_stock_update_without_bling_reports_failure() {
        let response = send(
            state(&BlingConfig::default()),
            json_request("PUT", "/api/products/42/stock", &json!({"quantity": 5})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"success": false}));
    }

    #[tokio::test]
    async fn test_negative_stock_is_bad_request() {
        let response = send(
            state(&BlingConfig::default()),
            json_request("PUT", "/api/products/42/stock", &json!({"quantity": -1})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/produtos/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let response = send(
            state(&configured(&server)),
            Request::get("/api/products/404").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_product_id_is_bad_request() {
        let server = MockServer::start().await;

        let response = send(
            state(&configured(&server)),
            Request::get("/api/products/caneca%20azul")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
