//! HTTP 客户端
//!
//! 封装对网关与管理服务的调用，返回状态码与 JSON 响应体，便于断言错误场景。

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST /api/buy
    pub async fn buy(&self, body: &Value) -> Result<(StatusCode, Value)> {
        let response = self
            .client
            .post(format!("{}/api/buy", self.base_url))
            .json(body)
            .send()
            .await?;
        Self::into_json(response).await
    }

    /// GET /api/purchases，查询串原样拼接
    pub async fn purchases(&self, query: &str) -> Result<(StatusCode, Value)> {
        let response = self
            .client
            .get(format!("{}/api/purchases?{}", self.base_url, query))
            .send()
            .await?;
        Self::into_json(response).await
    }

    /// 返回探针的状态码
    pub async fn probe(&self, path: &str) -> Result<StatusCode> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        Ok(response.status())
    }

    async fn into_json(response: reqwest::Response) -> Result<(StatusCode, Value)> {
        let status = response.status();
        let body = response.json::<Value>().await?;
        Ok((status, body))
    }
}
