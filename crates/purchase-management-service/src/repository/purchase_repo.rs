//! PostgreSQL 购买记录仓储

use async_trait::async_trait;
use purchase_shared::query::{PurchaseFilter, PurchaseQuery};
use sqlx::{PgPool, Row};

use super::traits::PurchaseRepositoryTrait;
use crate::error::StorageError;
use crate::models::{NewPurchaseRecord, PurchaseId, PurchaseRecord};

/// 过滤条件为 NULL 时不生效，两个条件同时存在时按 AND 组合
const FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL OR userid = $1)
      AND ($2::text IS NULL OR username = $2)
"#;

pub struct PurchaseRepository {
    pool: PgPool,
}

impl PurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseRepositoryTrait for PurchaseRepository {
    async fn insert(&self, record: &NewPurchaseRecord) -> Result<PurchaseId, StorageError> {
        let row = sqlx::query(
            r#"
            INSERT INTO purchases (username, userid, price, "timestamp")
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&record.username)
        .bind(&record.userid)
        .bind(record.price)
        .bind(record.timestamp)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::new("insert", e))?;

        Ok(row.get("id"))
    }

    async fn find(&self, query: &PurchaseQuery) -> Result<Vec<PurchaseRecord>, StorageError> {
        // 排序方向来自枚举，不接受外部字符串
        let direction = query.sort.as_sql();
        let sql = format!(
            r#"
            SELECT id, username, userid, price, "timestamp", created_at, updated_at
            FROM purchases
            {FILTER_CLAUSE}
            ORDER BY "timestamp" {direction}, id {direction}
            LIMIT $3 OFFSET $4
            "#
        );

        sqlx::query_as::<_, PurchaseRecord>(&sql)
            .bind(query.filter.userid.as_deref())
            .bind(query.filter.username.as_deref())
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::new("find", e))
    }

    async fn count(&self, filter: &PurchaseFilter) -> Result<i64, StorageError> {
        let sql = format!("SELECT COUNT(*) AS total FROM purchases {FILTER_CLAUSE}");

        let row = sqlx::query(&sql)
            .bind(filter.userid.as_deref())
            .bind(filter.username.as_deref())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::new("count", e))?;

        Ok(row.get("total"))
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::new("health_check", e))
    }
}
