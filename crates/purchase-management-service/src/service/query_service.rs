//! 购买记录查询服务
//!
//! 把校验后的查询拆成分页查询与计数查询并发执行，再组装分页元数据。
//! 偏移分页不保证快照一致：两次翻页之间的新写入可能导致结果漂移。

use std::sync::Arc;

use purchase_shared::observability::metrics;
use purchase_shared::query::{Pagination, PurchasePage, PurchaseQuery};
use tracing::{debug, instrument};

use crate::error::QueryError;
use crate::models::PurchaseRecord;
use crate::repository::PurchaseRepositoryTrait;

pub struct PurchaseQueryService<R: PurchaseRepositoryTrait + ?Sized> {
    repository: Arc<R>,
}

impl<R: PurchaseRepositoryTrait + ?Sized> PurchaseQueryService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self))]
    pub async fn query(
        &self,
        query: &PurchaseQuery,
    ) -> Result<PurchasePage<PurchaseRecord>, QueryError> {
        let result = tokio::try_join!(
            self.repository.find(query),
            self.repository.count(&query.filter)
        );

        let (records, total) = match result {
            Ok(found) => found,
            Err(e) => {
                metrics::record_query("unavailable");
                return Err(QueryError::from(e));
            }
        };

        metrics::record_query("success");
        let pagination = Pagination::new(total, query.limit, query.offset, records.len());
        debug!(
            total,
            returned = records.len(),
            has_more = pagination.has_more,
            "查询完成"
        );

        Ok(PurchasePage {
            records,
            pagination,
        })
    }

    /// 存储是否可用
    pub async fn is_store_ready(&self) -> bool {
        self.repository.health_check().await.is_ok()
    }
}
