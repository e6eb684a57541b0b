//! 购买事件摄取
//!
//! 流程：解析 -> 校验 -> 写入存储。
//! 格式错误的记录永远无法处理，记录日志后跳过；存储失败则交给消费循环重新投递，
//! 宁可重复持久化也不丢数据。

use std::sync::Arc;

use purchase_shared::events::PurchaseEvent;
use purchase_shared::kafka::MessageDisposition;
use tracing::{info, instrument};

use crate::error::IngestError;
use crate::models::{NewPurchaseRecord, PurchaseId};
use crate::repository::PurchaseRepositoryTrait;

pub struct PurchaseIngestor<R: PurchaseRepositoryTrait + ?Sized> {
    repository: Arc<R>,
}

impl<R: PurchaseRepositoryTrait + ?Sized> PurchaseIngestor<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// 摄取一条原始记录，成功时返回存储分配的 ID
    #[instrument(skip(self, raw), fields(bytes = raw.len()))]
    pub async fn ingest(&self, raw: &[u8]) -> Result<PurchaseId, IngestError> {
        let event = PurchaseEvent::decode(raw)?;

        let (userid, username, price) = (event.userid.clone(), event.username.clone(), event.price);
        let id = self.repository.insert(&NewPurchaseRecord::from(event)).await?;

        info!(purchase_id = id, %userid, %username, price, "购买记录已持久化");
        Ok(id)
    }
}

impl<R: PurchaseRepositoryTrait + ?Sized> Clone for PurchaseIngestor<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

/// 摄取结果对应的位点处置
///
/// 成功与格式错误都提交位点，只有存储失败需要重新投递。
pub fn disposition(result: &Result<PurchaseId, IngestError>) -> MessageDisposition {
    match result {
        Ok(_) | Err(IngestError::Malformed(_)) => MessageDisposition::Commit,
        Err(IngestError::StorageFailure(_)) => MessageDisposition::Redeliver,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::repository::MockPurchaseRepositoryTrait;
    use purchase_shared::events::SchemaError;

    const VALID: &[u8] =
        br#"{"username":"alice","userid":"u1","price":9.99,"timestamp":"2024-05-01T08:30:00.000Z"}"#;

    #[tokio::test]
    async fn test_valid_record_is_persisted() {
        let mut repo = MockPurchaseRepositoryTrait::new();
        repo.expect_insert()
            .withf(|r| r.userid == "u1" && r.username == "alice" && r.price == 9.99)
            .times(1)
            .returning(|_| Ok(42));

        let ingestor = PurchaseIngestor::new(Arc::new(repo));
        let result = ingestor.ingest(VALID).await;

        tokio_test::assert_ok!(&result);
        assert_eq!(result.as_ref().ok(), Some(&42));
        assert_eq!(disposition(&result), MessageDisposition::Commit);
    }

    #[tokio::test]
    async fn test_missing_userid_is_skipped_without_touching_store() {
        let mut repo = MockPurchaseRepositoryTrait::new();
        repo.expect_insert().never();

        let ingestor = PurchaseIngestor::new(Arc::new(repo));
        let result = ingestor
            .ingest(br#"{"username":"alice","price":1,"timestamp":"2024-05-01T08:30:00Z"}"#)
            .await;

        assert!(matches!(
            result,
            Err(IngestError::Malformed(SchemaError::MissingField("userid")))
        ));
        assert_eq!(disposition(&result), MessageDisposition::Commit);
    }

    #[tokio::test]
    async fn test_empty_payload_is_malformed() {
        let mut repo = MockPurchaseRepositoryTrait::new();
        repo.expect_insert().never();

        let ingestor = PurchaseIngestor::new(Arc::new(repo));
        let result = ingestor.ingest(b"").await;

        assert!(matches!(result, Err(IngestError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_storage_failure_requests_redelivery() {
        let mut repo = MockPurchaseRepositoryTrait::new();
        repo.expect_insert()
            .times(1)
            .returning(|_| Err(StorageError::new("insert", "connection refused")));

        let ingestor = PurchaseIngestor::new(Arc::new(repo));
        let result = ingestor.ingest(VALID).await;

        tokio_test::assert_err!(&result);
        assert_eq!(disposition(&result), MessageDisposition::Redeliver);
    }
}
