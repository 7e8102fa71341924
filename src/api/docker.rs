//! Docker Compose 部署 API
//!
//! 包含 /docker/up, /docker/down, /docker/status 端点

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use crate::domain::deploy::{CommandResult, DeploymentOutcome, FailureKind, SyncOutcome};
use crate::error::{ApiError, ApiResult};
use crate::infra::CommandError;
use crate::services::deployer::classify;
use crate::state::AppState;

/// 命令执行成功响应
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub status: &'static str,
    pub message: String,
    pub stdout: String,
    pub stderr: String,
    /// 源码同步结果（仅 /docker/up）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncOutcome>,
}

/// 容器状态响应
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: String,
    /// `docker ps` 原始表格输出
    pub containers: String,
}

/// 每个操作的响应文案
struct Messages {
    succeeded: &'static str,
    failed: &'static str,
    timed_out: &'static str,
}

const UP: Messages = Messages {
    succeeded: "Docker compose up executed successfully",
    failed: "Docker compose up failed",
    timed_out: "Docker compose up command timed out",
};

const DOWN: Messages = Messages {
    succeeded: "Docker compose down executed successfully",
    failed: "Docker compose down failed",
    timed_out: "Docker compose down command timed out",
};

/// 创建部署路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/docker/up", post(compose_up))
        .route("/docker/down", post(compose_down))
        .route("/docker/status", get(compose_status))
}

/// 同步源码并重建、启动服务
///
/// POST /docker/up
/// 请求体（webhook payload）可选，仅记录日志
async fn compose_up(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<serde_json::Value>>,
) -> ApiResult<Json<CommandResponse>> {
    if let Some(Json(payload)) = payload {
        debug!(payload = %payload, "Received deploy trigger");
    }

    let result = state.deployer.deploy().await;
    respond(result, &UP)
}

/// 停止并移除服务
///
/// POST /docker/down
async fn compose_down(State(state): State<Arc<AppState>>) -> ApiResult<Json<CommandResponse>> {
    let result = state.deployer.teardown().await;
    respond(result, &DOWN)
}

/// 查询服务容器状态
///
/// GET /docker/status
async fn compose_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatusResponse>> {
    let containers = state.deployer.status().await.map_err(|e| {
        error!(error = %e, "Failed to query container status");
        ApiError::internal(e.to_string())
    })?;

    Ok(Json(StatusResponse {
        status: "success",
        message: "Docker status retrieved successfully".to_string(),
        containers,
    }))
}

/// 将编排结果映射为 HTTP 响应
///
/// 超时 -> 408，非零退出 -> 500（附输出和退出码），环境错误 -> 500
fn respond(
    result: Result<DeploymentOutcome, CommandError>,
    messages: &Messages,
) -> ApiResult<Json<CommandResponse>> {
    let kind = classify(&result);
    let outcome = result.map_err(|e| {
        error!(error = %e, "Deployment command could not run");
        ApiError::internal(e.to_string())
    })?;

    let significant = outcome
        .lifecycle
        .significant_result()
        .cloned()
        .unwrap_or_else(|| CommandResult::not_run("no command was run"));

    match kind {
        None => Ok(Json(CommandResponse {
            status: "success",
            message: messages.succeeded.to_string(),
            stdout: significant.stdout,
            stderr: significant.stderr,
            sync: outcome.sync,
        })),
        Some(FailureKind::Transient) => Err(ApiError::timeout(messages.timed_out)),
        Some(FailureKind::BuildFailure | FailureKind::EnvironmentFailure) => Err(
            ApiError::command_failed(messages.failed, significant, outcome.sync),
        ),
    }
}
