//! 网关错误类型定义

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use purchase_shared::error::{PurchaseError, ValidationError};
use serde_json::json;

/// 发布购买事件失败
///
/// 事件未被 broker 确认即视为没有持久记录，调用方必须把失败反馈给请求方。
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("事件序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("投递超时: topic={topic}, key={key}")]
    Timeout { topic: String, key: String },

    #[error("投递失败: topic={topic}, key={key}, reason={reason}")]
    Broker {
        topic: String,
        key: String,
        reason: String,
    },
}

impl PublishError {
    /// 附加 topic 与分区键，便于定位是哪个用户的事件没有送达
    pub fn from_kafka(topic: &str, key: &str, err: PurchaseError) -> Self {
        match err {
            PurchaseError::KafkaTimeout { .. } => Self::Timeout {
                topic: topic.to_string(),
                key: key.to_string(),
            },
            other => Self::Broker {
                topic: topic.to_string(),
                key: key.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// 指标标签
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::Serialization(_) => "serialization",
            Self::Timeout { .. } => "timeout",
            Self::Broker { .. } => "failed",
        }
    }
}

/// 网关 HTTP 错误
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("请求格式错误: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("管理服务不可达: {0}")]
    UpstreamUnavailable(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Publish(PublishError::Serialization(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Publish(_) | Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Publish(PublishError::Serialization(_)) => "SERIALIZATION_ERROR",
            Self::Publish(PublishError::Timeout { .. }) => "PUBLISH_TIMEOUT",
            Self::Publish(PublishError::Broker { .. }) => "PUBLISH_FAILED",
            Self::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 基础设施错误只返回通用提示，详细信息记录在日志中
        let message = match &self {
            Self::Publish(e) => {
                tracing::error!(error = %e, "购买事件发布失败");
                "购买请求未能送达，请稍后重试".to_string()
            }
            Self::UpstreamUnavailable(e) => {
                tracing::error!(error = %e, "管理服务不可达");
                "查询服务暂不可用，请稍后重试".to_string()
            }
            Self::Internal(e) => {
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

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_error_from_kafka() {
        let err = PublishError::from_kafka(
            "purchases",
            "u1",
            PurchaseError::KafkaTimeout {
                topic: "purchases".to_string(),
            },
        );
        assert!(matches!(err, PublishError::Timeout { ref key, .. } if key == "u1"));
        assert_eq!(err.metric_label(), "timeout");

        let err = PublishError::from_kafka(
            "purchases",
            "u1",
            PurchaseError::Kafka("broker down".to_string()),
        );
        assert!(err.to_string().contains("key=u1"));
        assert!(err.to_string().contains("broker down"));
    }

    #[test]
    fn test_status_codes() {
        let validation = GatewayError::from(ValidationError::new("price", "必须是非负数"));
        assert_eq!(validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.error_code(), "VALIDATION_ERROR");

        let publish = GatewayError::from(PublishError::Timeout {
            topic: "purchases".to_string(),
            key: "u1".to_string(),
        });
        assert_eq!(publish.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(publish.error_code(), "PUBLISH_TIMEOUT");

        let upstream = GatewayError::UpstreamUnavailable("connection refused".to_string());
        assert_eq!(upstream.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
