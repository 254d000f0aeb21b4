//! HTTP Server - LINE webhook 入口和健康检查

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::health::{backend_health_handler, health_handler};
use crate::state::AppState;
use crate::webhook::webhook_handler;

/// 创建路由
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        // 健康检查
        .route("/health", get(health_handler))
        .route("/health/backend", get(backend_health_handler))
        // LINE webhook
        .route("/webhook", post(webhook_handler))
        .route("/callback", post(webhook_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 运行 HTTP 服务器，直到关闭令牌被取消
pub async fn run_server(state: AppState, bind: &str) -> anyhow::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Parley server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Parley server stopped");
    Ok(())
}
