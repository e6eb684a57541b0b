//! 统一错误处理模块
//!
//! 定义各服务共享的基础设施错误类型，使用 thiserror 提供良好的错误信息。
//! 业务相关的错误（发布失败、摄取失败、查询失败）由各服务在此基础上自行定义。

use thiserror::Error;

/// 参数校验错误
///
/// 只在边界层产生：请求体或查询参数不合法时直接拒绝，永远不会进入
/// Producer / Query Service，也不会被重试。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("参数 {field} 无效: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 从 validator 错误转换，只保留第一个出错字段
impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| errors.to_string());
                Self::new(field.to_string(), message)
            }
            None => Self::new("request", errors.to_string()),
        }
    }
}

/// 系统错误类型
#[derive(Debug, Error)]
pub enum PurchaseError {
    // ==================== 数据库错误 ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // ==================== Kafka 错误 ====================
    #[error("Kafka 错误: {0}")]
    Kafka(String),

    #[error("Kafka 投递超时: topic={topic}")]
    KafkaTimeout { topic: String },

    // ==================== 配置错误 ====================
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    // ==================== 验证错误 ====================
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, PurchaseError>;

impl PurchaseError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::Kafka(_) => "KAFKA_ERROR",
            Self::KafkaTimeout { .. } => "KAFKA_TIMEOUT",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Kafka(_) | Self::KafkaTimeout { .. }
        )
    }
}
