//! Bling connection routes.
//!
//! Status reporting and the OAuth authorization-code exchange. The operator
//! authorizes the app in Bling and pastes the returned code here.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::bling::ConnectionStatus;
use crate::error::AppError;
use crate::state::AppState;

/// Build the Bling connection router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/bling/status", get(status))
        .route("/api/bling/authorize", post(authorize))
}

/// Request to connect an OAuth account.
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub code: String,
}

/// Result of a successful connection.
#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub connected: bool,
    pub expires_at: DateTime<Utc>,
}

/// GET /api/bling/status - Current credential state, without contacting Bling.
#[instrument(skip(state))]
async fn status(State(state): State<AppState>) -> Json<ConnectionStatus> {
    Json(state.bling().connection_status().await)
}

/// POST /api/bling/authorize - Exchange an authorization code for tokens.
#[instrument(skip(state, request))]
async fn authorize(
    State(state): State<AppState>,
    Json(request): Json<AuthorizeRequest>,
) -> Result<Json<AuthorizeResponse>, AppError> {
    let code = request.code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("authorization code is required".to_string()));
    }

    let tokens = state.bling().connect_with_code(code).await?;

    Ok(Json(AuthorizeResponse {
        connected: true,
        expires_at: tokens.expires_at,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use secrecy::SecretString;
    use serde_json::json;

    use crate::config::BlingConfig;
    use crate::routes::test_support::{json_body, send, state};

    #[tokio::test]
    async fn test_status_not_configured() {
        let response = send(
            state(&BlingConfig::default()),
            Request::get("/api/bling/status").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"state": "not_configured"}));
    }

    #[tokio::test]
    async fn test_status_static_key() {
        let config = BlingConfig {
            api_key: Some(SecretString::from("static-key")),
            ..BlingConfig::default()
        };
        let response = send(
            state(&config),
            Request::get("/api/bling/status").body(Body::empty()).unwrap(),
        )
        .await;

        assert_eq!(json_body(response).await, json!({"state": "static_key"}));
    }

    #[tokio::test]
    async fn test_authorize_requires_code() {
        let request = Request::post("/api/bling/authorize")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"code": "  "}).to_string()))
            .unwrap();

        let response = send(state(&BlingConfig::default()), request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
