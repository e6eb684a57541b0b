//! 购买提交接口

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use purchase_shared::events::{PurchaseEvent, PurchaseIntent};
use tracing::{info, instrument};

use crate::dto::{BuyRequest, BuyResponse};
use crate::error::{GatewayError, Result};
use crate::state::AppState;

/// 提交购买
///
/// POST /api/buy
///
/// 参数校验失败直接返回 400，不会触达 broker；发布失败返回 503。
#[instrument(skip(state, payload))]
pub async fn buy(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BuyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BuyResponse>)> {
    let Json(request) = payload.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;

    let intent = PurchaseIntent::from_raw(
        request.username.as_deref(),
        request.userid.as_deref(),
        request.price.as_ref(),
    )?;

    let event = PurchaseEvent::stamp(intent, Utc::now());
    let receipt = state.publisher.publish(&event).await?;

    info!(
        userid = %event.userid,
        username = %event.username,
        price = event.price,
        partition = receipt.partition,
        offset = receipt.offset,
        "购买请求已受理"
    );

    Ok((StatusCode::CREATED, Json(BuyResponse::accepted(event))))
}
