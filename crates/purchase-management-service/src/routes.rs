//! 路由配置模块

use axum::{Router, routing::get};

use crate::{handlers, state::AppState};

/// 业务接口，挂载在 /api 下
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/purchases", get(handlers::purchases::list_purchases))
}

/// 健康检查接口
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/live", get(handlers::health::live))
        .route("/health/ready", get(handlers::health::ready))
}

/// 完整路由（不含 CORS 与可观测性中间件）
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .merge(health_routes())
        .with_state(state)
}
