//! 仓储 Trait 定义

use async_trait::async_trait;
use purchase_shared::query::{PurchaseFilter, PurchaseQuery};

use crate::error::StorageError;
use crate::models::{NewPurchaseRecord, PurchaseId, PurchaseRecord};

/// 购买记录仓储接口
///
/// 只追加：写入永远生成新记录，不覆盖已有记录。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseRepositoryTrait: Send + Sync {
    async fn insert(&self, record: &NewPurchaseRecord) -> Result<PurchaseId, StorageError>;

    /// 按过滤条件、排序与分页返回一页记录
    ///
    /// 按 `timestamp` 排序，相同时间按 `id` 同向排序，保证翻页结果确定。
    async fn find(&self, query: &PurchaseQuery) -> Result<Vec<PurchaseRecord>, StorageError>;

    /// 满足过滤条件的记录总数，与分页无关
    async fn count(&self, filter: &PurchaseFilter) -> Result<i64, StorageError>;

    async fn health_check(&self) -> Result<(), StorageError>;
}
