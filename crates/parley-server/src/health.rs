//! 健康检查

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use tracing::warn;

use crate::state::AppState;

/// GET /health
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /health/backend - 检查模型服务是否可达
pub async fn backend_health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.backend.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "backend": "reachable" })),
        ),
        Err(e) => {
            // detail stays in the log; the endpoint is public
            warn!("Backend health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "backend": "unreachable" })),
            )
        }
    }
}
