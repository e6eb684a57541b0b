//! 应用状态定义

use std::sync::Arc;

use crate::producer::PurchasePublisher;
use crate::upstream::ManagementApiClient;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 购买事件发布者
    pub publisher: Arc<dyn PurchasePublisher>,
    /// 管理服务客户端
    pub management_api: ManagementApiClient,
}

impl AppState {
    pub fn new(publisher: Arc<dyn PurchasePublisher>, management_api: ManagementApiClient) -> Self {
        Self {
            publisher,
            management_api,
        }
    }
}
