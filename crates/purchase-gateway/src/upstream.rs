//! 管理服务客户端
//!
//! 网关的查询接口不访问存储，而是把校验后的参数转发给管理服务，原样转交状态码与响应体。

use axum::http::StatusCode;
use purchase_shared::config::ManagementApiConfig;
use purchase_shared::error::PurchaseError;
use purchase_shared::query::PurchaseQuery;
use tracing::{debug, instrument};

use crate::error::GatewayError;

/// 管理服务的原始响应
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

#[derive(Clone)]
pub struct ManagementApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ManagementApiClient {
    pub fn new(config: &ManagementApiConfig) -> Result<Self, PurchaseError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| PurchaseError::Internal(format!("创建 HTTP 客户端失败: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn purchases_url(&self) -> String {
        format!("{}/api/purchases", self.base_url)
    }

    /// 转发查询
    ///
    /// 只有网络错误或超时才返回 `UpstreamUnavailable`，管理服务返回的任何状态码都原样转交。
    #[instrument(skip(self))]
    pub async fn list_purchases(&self, query: &PurchaseQuery) -> Result<UpstreamResponse, GatewayError> {
        let url = self.purchases_url();
        debug!(%url, "转发查询到管理服务");

        let response = self
            .client
            .get(&url)
            .query(&query.to_query_pairs())
            .send()
            .await
            .map_err(|e| GatewayError::UpstreamUnavailable(e.to_string()))?;

        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        let body = response
            .bytes()
            .await
            .map_err(|e| GatewayError::UpstreamUnavailable(e.to_string()))?;

        Ok(UpstreamResponse {
            status,
            body: body.to_vec(),
        })
    }
}
