//! 健康检查

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use purchase_shared::kafka::ConsumerState;
use serde_json::{Value, json};

use crate::state::AppState;

const SERVICE_NAME: &str = "purchase-management-service";

/// 综合健康状态
///
/// 数据库可用且消费者处于 running 时为 healthy，否则返回 503。
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = state.query_service.is_store_ready().await;
    let consumer = state.consumer_state();
    let healthy = db_ok && consumer == ConsumerState::Running;

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "service": SERVICE_NAME,
            "timestamp": Utc::now(),
            "checks": {
                "database": if db_ok { "connected" } else { "disconnected" },
                "consumer": consumer.as_str(),
            }
        })),
    )
}

/// 存活探针
pub async fn live() -> Json<Value> {
    Json(json!({
        "status": "alive",
        "service": SERVICE_NAME,
        "timestamp": Utc::now(),
    }))
}

/// 就绪探针
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let ready = state.consumer_state() == ConsumerState::Running
        && state.query_service.is_store_ready().await;

    if ready {
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
