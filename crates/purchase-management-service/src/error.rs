//! 管理服务错误类型定义
//!
//! - `StorageError`：存储不可用，属于暂时性故障
//! - `IngestError`：消费端摄取失败，区分永久跳过与等待重新投递
//! - `QueryError`：查询失败，对调用方表现为服务不可用
//! - `ManagementError`：HTTP 层错误映射

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use purchase_shared::error::{PurchaseError, ValidationError};
use purchase_shared::events::SchemaError;
use serde_json::json;

/// 存储操作失败，记录失败的操作名以便排查
#[derive(Debug, thiserror::Error)]
#[error("存储操作 {operation} 失败: {reason}")]
pub struct StorageError {
    pub operation: &'static str,
    pub reason: String,
}

impl StorageError {
    pub fn new(operation: &'static str, reason: impl std::fmt::Display) -> Self {
        Self {
            operation,
            reason: reason.to_string(),
        }
    }
}

/// 摄取单条记录的失败原因
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// 记录无法解析或缺少必填字段，永久跳过
    #[error("记录格式错误: {0}")]
    Malformed(#[from] SchemaError),

    /// 存储暂时不可用，等待重新投递
    #[error(transparent)]
    StorageFailure(#[from] StorageError),
}

impl IngestError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }
}

/// 查询失败
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("查询存储失败: {0}")]
    Unavailable(#[from] StorageError),
}

/// 管理服务 HTTP 错误
#[derive(Debug, thiserror::Error)]
pub enum ManagementError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("请求格式错误: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Shared(#[from] PurchaseError),
}

impl ManagementError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Query(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Shared(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Shared(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Query(_) => "STORE_UNAVAILABLE",
            Self::Shared(e) => e.code(),
        }
    }
}

impl IntoResponse for ManagementError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            Self::Query(e) => {
                tracing::error!(error = %e, "查询购买记录失败");
                "存储暂不可用，请稍后重试".to_string()
            }
            Self::Shared(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ManagementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_retryability() {
        let malformed = IngestError::from(SchemaError::MissingField("userid"));
        assert!(!malformed.is_retryable());
        assert_eq!(malformed.to_string(), "记录格式错误: 缺少必填字段: userid");

        let storage = IngestError::from(StorageError::new("insert", "connection reset"));
        assert!(storage.is_retryable());
        assert_eq!(storage.to_string(), "存储操作 insert 失败: connection reset");
    }

    #[test]
    fn test_status_codes() {
        let err = ManagementError::from(ValidationError::new("limit", "必须在 1 到 1000 之间"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ManagementError::from(QueryError::from(StorageError::new("count", "timeout")));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
    }
}
