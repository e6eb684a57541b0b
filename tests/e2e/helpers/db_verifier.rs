//! 数据库验证工具

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, sqlx::FromRow)]
pub struct StoredPurchase {
    pub id: i64,
    pub username: String,
    pub userid: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

pub struct DbVerifier {
    pool: PgPool,
}

impl DbVerifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按写入顺序返回某用户的全部记录
    pub async fn purchases_of(&self, userid: &str) -> Result<Vec<StoredPurchase>> {
        let rows = sqlx::query_as::<_, StoredPurchase>(
            r#"
            SELECT id, username, userid, price, "timestamp"
            FROM purchases
            WHERE userid = $1
            ORDER BY id ASC
            "#,
        )
        .bind(userid)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_of(&self, userid: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM purchases WHERE userid = $1")
            .bind(userid)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// 清理测试用户的数据
    pub async fn delete_user(&self, userid: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM purchases WHERE userid = $1")
            .bind(userid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
