//! 应用状态定义

use std::sync::Arc;

use purchase_shared::kafka::ConsumerState;
use tokio::sync::watch;

use crate::repository::PurchaseRepositoryTrait;
use crate::service::PurchaseQueryService;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub query_service: Arc<PurchaseQueryService<dyn PurchaseRepositoryTrait>>,
    /// 消费者状态，就绪探针据此判断是否已开始消费
    pub consumer_state: watch::Receiver<ConsumerState>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn PurchaseRepositoryTrait>,
        consumer_state: watch::Receiver<ConsumerState>,
    ) -> Self {
        Self {
            query_service: Arc::new(PurchaseQueryService::new(repository)),
            consumer_state,
        }
    }

    pub fn consumer_state(&self) -> ConsumerState {
        *self.consumer_state.borrow()
    }
}
