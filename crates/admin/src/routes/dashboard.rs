//! Dashboard route handlers.

use axum::{Json, Router, extract::State, routing::get};
use loja_core::SalesSnapshot;
use tracing::instrument;

use crate::state::AppState;

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/dashboard/stats", get(stats))
}

/// GET /api/dashboard/stats - Today's sales figures from Bling.
///
/// Always 200: an unreachable Bling yields zeros and an empty feed.
#[instrument(skip(state))]
async fn stats(State(state): State<AppState>) -> Json<SalesSnapshot> {
    Json(state.bling().get_sales_snapshot().await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    use crate::config::BlingConfig;
    use crate::routes::test_support::{json_body, send, state};

    #[tokio::test]
    async fn test_stats_without_bling_is_zero_snapshot() {
        let response = send(
            state(&BlingConfig::default()),
            Request::get("/api/dashboard/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"today_total": "0", "new_order_count": 0, "recent_orders": []})
        );
    }
}
