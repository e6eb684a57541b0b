//! 购买记录实体

use chrono::{DateTime, Utc};
use purchase_shared::events::{PurchaseEvent, iso8601_millis};
use serde::{Deserialize, Serialize};

/// 存储层分配的记录 ID
pub type PurchaseId = i64;

/// 已持久化的购买记录
///
/// `id`、`created_at`、`updated_at` 由存储层生成，`timestamp` 原样保留生产者写入的事件时间。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub id: PurchaseId,
    pub username: String,
    pub userid: String,
    pub price: f64,
    #[serde(with = "iso8601_millis")]
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 待写入的购买记录
#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchaseRecord {
    pub username: String,
    pub userid: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<PurchaseEvent> for NewPurchaseRecord {
    fn from(event: PurchaseEvent) -> Self {
        Self {
            username: event.username,
            userid: event.userid,
            price: event.price,
            timestamp: event.timestamp,
        }
    }
}

impl NewPurchaseRecord {
    /// 补全存储层字段
    pub fn into_record(self, id: PurchaseId, now: DateTime<Utc>) -> PurchaseRecord {
        PurchaseRecord {
            id,
            username: self.username,
            userid: self.userid,
            price: self.price,
            timestamp: self.timestamp,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_serializes_camel_case() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
        let record = NewPurchaseRecord {
            username: "alice".to_string(),
            userid: "u1".to_string(),
            price: 9.99,
            timestamp: ts,
        }
        .into_record(1, ts);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["userid"], "u1");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert!(value.get("created_at").is_none());
    }
}
