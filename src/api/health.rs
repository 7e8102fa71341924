//! 健康检查 API
//!
//! 包含 /, /health 端点

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
}

/// 健康检查响应
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// 创建健康检查路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

/// GET /
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        message: "Docker Compose Runner API is running",
    })
}

/// GET /health
/// 无需认证，不检查 docker
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse { status: "healthy" })
}
