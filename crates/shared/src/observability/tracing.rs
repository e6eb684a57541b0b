//! 日志初始化
//!
//! 基于 tracing-subscriber 组合环境过滤器与格式化层，
//! 生产环境输出 JSON 结构化日志，开发环境输出人类可读格式。

use anyhow::Result;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use super::ObservabilityConfig;

/// 构建环境过滤器：RUST_LOG 优先，其次是配置中的日志级别
pub fn build_env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化全局 tracing subscriber
///
/// 重复初始化（例如测试中多次调用）会返回错误而不是 panic。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = build_env_filter(config);

    let fmt_layer = if config.json_logs {
        fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
