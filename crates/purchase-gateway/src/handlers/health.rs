//! 健康检查

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde_json::{Value, json};

use crate::state::AppState;

const SERVICE_NAME: &str = "purchase-gateway";

/// 综合健康状态：broker 不可达时返回 503
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let kafka_ok = state.publisher.is_ready().await;
    let status = if kafka_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if kafka_ok { "healthy" } else { "unhealthy" },
            "service": SERVICE_NAME,
            "timestamp": Utc::now(),
            "checks": {
                "kafka": if kafka_ok { "connected" } else { "disconnected" }
            }
        })),
    )
}

/// 存活探针：进程正常即返回 200
pub async fn live() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "service": SERVICE_NAME,
        "timestamp": Utc::now(),
    }))
}

/// 就绪探针
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if state.publisher.is_ready().await {
        (
            StatusCode::OK,
            Json(json!({ "status": "ready", "timestamp": Utc::now() })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready", "timestamp": Utc::now() })),
        )
    }
}
