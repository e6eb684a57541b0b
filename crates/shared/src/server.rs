//! HTTP 服务公共设施
//!
//! 两个服务的 main 共用的 CORS 配置与关闭信号监听。

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;

/// 按配置构造 CORS 层
///
/// `cors_origins` 为 "*" 时允许任意来源，否则按逗号拆分为白名单，无法解析的项被忽略。
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins = config.cors_origins.trim();

    if origins == "*" {
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = s, "忽略无法解析的 CORS 来源");
                None
            }
        })
        .collect();

    info!("CORS allowed_origins: {}", origins);
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
/// 信号处理器注册失败时该分支永不完成，另一个信号仍然有效。
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
