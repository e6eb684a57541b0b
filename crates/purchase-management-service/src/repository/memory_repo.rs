//! 进程内购买记录仓储
//!
//! 用于测试和无数据库的本地开发，语义与 PostgreSQL 实现一致。

use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use purchase_shared::query::{PurchaseFilter, PurchaseQuery, SortOrder};

use super::traits::PurchaseRepositoryTrait;
use crate::error::StorageError;
use crate::models::{NewPurchaseRecord, PurchaseId, PurchaseRecord};

pub struct MemoryPurchaseRepository {
    records: RwLock<Vec<PurchaseRecord>>,
    next_id: AtomicI64,
}

impl Default for MemoryPurchaseRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPurchaseRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// 全部记录的快照（按写入顺序）
    pub fn snapshot(&self) -> Vec<PurchaseRecord> {
        self.records.read().clone()
    }
}

fn compare(a: &PurchaseRecord, b: &PurchaseRecord, sort: SortOrder) -> Ordering {
    let ascending = a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id));
    match sort {
        SortOrder::Asc => ascending,
        SortOrder::Desc => ascending.reverse(),
    }
}

#[async_trait]
impl PurchaseRepositoryTrait for MemoryPurchaseRepository {
    async fn insert(&self, record: &NewPurchaseRecord) -> Result<PurchaseId, StorageError> {
        if record.price < 0.0 {
            return Err(StorageError::new("insert", "price 违反非负约束"));
        }

        let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
        self.records
            .write()
            .push(record.clone().into_record(id, Utc::now()));
        Ok(id)
    }

    async fn find(&self, query: &PurchaseQuery) -> Result<Vec<PurchaseRecord>, StorageError> {
        let mut matched: Vec<PurchaseRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| query.filter.matches(&r.userid, &r.username))
            .cloned()
            .collect();

        matched.sort_by(|a, b| compare(a, b, query.sort));

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        Ok(matched.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, filter: &PurchaseFilter) -> Result<i64, StorageError> {
        let total = self
            .records
            .read()
            .iter()
            .filter(|r| filter.matches(&r.userid, &r.username))
            .count();
        Ok(total as i64)
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn record(userid: &str, username: &str, seconds: i64) -> NewPurchaseRecord {
        NewPurchaseRecord {
            username: username.to_string(),
            userid: userid.to_string(),
            price: seconds as f64,
            timestamp: at(seconds),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let repo = MemoryPurchaseRepository::new();
        let first = repo.insert(&record("u1", "alice", 1)).await.unwrap();
        let second = repo.insert(&record("u1", "alice", 1)).await.unwrap();

        assert!(second > first);
        // 重复记录同样追加
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn test_find_sorts_by_timestamp_then_id() {
        let repo = MemoryPurchaseRepository::new();
        repo.insert(&record("u1", "alice", 5)).await.unwrap();
        let tie_a = repo.insert(&record("u1", "alice", 3)).await.unwrap();
        let tie_b = repo.insert(&record("u1", "alice", 3)).await.unwrap();
        repo.insert(&record("u1", "alice", 1)).await.unwrap();

        let asc = repo
            .find(&PurchaseQuery {
                sort: SortOrder::Asc,
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = asc.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, tie_a, tie_b, 1]);

        let desc = repo.find(&PurchaseQuery::default()).await.unwrap();
        let ids: Vec<_> = desc.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, tie_b, tie_a, 4]);
    }

    #[tokio::test]
    async fn test_filters_are_conjunctive() {
        let repo = MemoryPurchaseRepository::new();
        repo.insert(&record("u1", "alice", 1)).await.unwrap();
        repo.insert(&record("u1", "alice-alt", 2)).await.unwrap();
        repo.insert(&record("u2", "alice", 3)).await.unwrap();

        let filter = PurchaseFilter::new(Some("u1"), Some("alice"));
        assert_eq!(repo.count(&filter).await.unwrap(), 1);
        assert_eq!(repo.count(&PurchaseFilter::by_userid("u1")).await.unwrap(), 2);
        assert_eq!(repo.count(&PurchaseFilter::default()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_offset_past_end_returns_empty_page() {
        let repo = MemoryPurchaseRepository::new();
        repo.insert(&record("u1", "alice", 1)).await.unwrap();

        let page = repo
            .find(&PurchaseQuery {
                offset: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_negative_price_is_rejected() {
        let repo = MemoryPurchaseRepository::new();
        let mut bad = record("u1", "alice", 1);
        bad.price = -0.5;

        assert!(repo.insert(&bad).await.is_err());
        assert!(repo.is_empty());
    }
}
