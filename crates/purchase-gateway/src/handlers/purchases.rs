//! 购买记录查询代理

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::header,
    response::{IntoResponse, Response},
};
use purchase_shared::query::{PurchaseQuery, PurchaseQueryParams};
use tracing::{info, instrument};

use crate::error::{GatewayError, Result};
use crate::state::AppState;

/// 查询购买记录
///
/// GET /api/purchases
///
/// 先按与管理服务相同的规则校验参数，再转发给管理服务。
#[instrument(skip(state, params))]
pub async fn list_purchases(
    State(state): State<AppState>,
    params: std::result::Result<Query<PurchaseQueryParams>, QueryRejection>,
) -> Result<Response> {
    let Query(params) = params.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let query = PurchaseQuery::try_from(params)?;

    let upstream = state.management_api.list_purchases(&query).await?;
    info!(
        status = upstream.status.as_u16(),
        limit = query.limit,
        offset = query.offset,
        "管理服务已响应"
    );

    Ok((
        upstream.status,
        [(header::CONTENT_TYPE, "application/json")],
        upstream.body,
    )
        .into_response())
}
