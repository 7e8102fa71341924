//! 统一错误处理
//!
//! 提供 `ApiError` 枚举实现 `IntoResponse`，所有失败都以
//! `{"status": "error", "message": ...}` 结构返回

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::deploy::{CommandResult, SyncOutcome};

/// API 错误响应结构
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncOutcome>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            stdout: None,
            stderr: None,
            return_code: None,
            sync: None,
        }
    }

    /// 附带命令输出和退出码
    pub fn with_output(mut self, result: &CommandResult) -> Self {
        self.stdout = Some(result.stdout.clone());
        self.stderr = Some(result.stderr.clone());
        self.return_code = Some(result.exit_code);
        self
    }

    pub fn with_sync(mut self, sync: Option<SyncOutcome>) -> Self {
        self.sync = sync;
        self
    }
}

/// 统一 API 错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 408 - 命令超时，可重新触发
    Timeout(String),
    /// 500 - 关键步骤非零退出
    CommandFailed {
        message: String,
        result: CommandResult,
        sync: Option<SyncOutcome>,
    },
    /// 500 - 环境错误（可执行文件或目录缺失等）
    Internal(String),
}

impl ApiError {
    /// 创建超时错误
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// 创建命令失败错误
    pub fn command_failed(
        message: impl Into<String>,
        result: CommandResult,
        sync: Option<SyncOutcome>,
    ) -> Self {
        Self::CommandFailed {
            message: message.into(),
            result,
            sync,
        }
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Timeout(message) => (StatusCode::REQUEST_TIMEOUT, ErrorResponse::new(message)),
            ApiError::CommandFailed {
                message,
                result,
                sync,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(message).with_output(&result).with_sync(sync),
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(format!("An error occurred: {}", message)),
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Timeout(m) => write!(f, "Timeout: {}", m),
            ApiError::CommandFailed { message, result, .. } => {
                write!(f, "{} (exit code {})", message, result.exit_code)
            }
            ApiError::Internal(m) => write!(f, "Internal error: {}", m),
        }
    }
}

impl std::error::Error for ApiError {}

/// 便捷类型别名
pub type ApiResult<T> = Result<T, ApiError>;
