//! 购买记录查询

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use purchase_shared::query::{PurchasePage, PurchaseQuery, PurchaseQueryParams};
use tracing::instrument;

use crate::error::{ManagementError, Result};
use crate::models::PurchaseRecord;
use crate::state::AppState;

/// 分页查询购买记录
///
/// GET /api/purchases?userid=&username=&limit=&offset=&sort=
#[instrument(skip(state, params))]
pub async fn list_purchases(
    State(state): State<AppState>,
    params: std::result::Result<Query<PurchaseQueryParams>, QueryRejection>,
) -> Result<Json<PurchasePage<PurchaseRecord>>> {
    let Query(params) = params.map_err(|e| ManagementError::InvalidRequest(e.body_text()))?;
    let query = PurchaseQuery::try_from(params)?;

    let page = state.query_service.query(&query).await?;
    Ok(Json(page))
}
