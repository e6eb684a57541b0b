//! 购买事件的数据结构
//!
//! `PurchaseIntent` 是边界层校验后的输入，`PurchaseEvent` 是在生产者与消费者之间
//! 传输的 JSON 记录。事件时间只在生产者发布时写入一次。

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use validator::Validate;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// PurchaseIntent
// ---------------------------------------------------------------------------

/// 经过校验的购买意图（生产者输入）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PurchaseIntent {
    #[validate(length(min = 1, max = 100, message = "长度必须在 1 到 100 个字符之间"))]
    pub username: String,

    #[validate(length(min = 1, max = 100, message = "长度必须在 1 到 100 个字符之间"))]
    pub userid: String,

    #[validate(range(min = 0.0, message = "必须是非负数"))]
    pub price: f64,
}

impl PurchaseIntent {
    /// 去除首尾空白后校验
    pub fn new(username: &str, userid: &str, price: f64) -> Result<Self, ValidationError> {
        if !price.is_finite() {
            return Err(ValidationError::new("price", "必须是有效数字"));
        }

        let intent = Self {
            username: username.trim().to_string(),
            userid: userid.trim().to_string(),
            price,
        };
        intent.validate()?;
        Ok(intent)
    }

    /// 从未经处理的请求字段构造
    ///
    /// `price` 可以是 JSON 数字，也可以是内容为数字的字符串。
    pub fn from_raw(
        username: Option<&str>,
        userid: Option<&str>,
        price: Option<&Value>,
    ) -> Result<Self, ValidationError> {
        let username = username.ok_or_else(|| ValidationError::new("username", "不能为空"))?;
        let userid = userid.ok_or_else(|| ValidationError::new("userid", "不能为空"))?;
        let price = match price {
            None | Some(Value::Null) => return Err(ValidationError::new("price", "不能为空")),
            Some(value) => coerce_price(value)
                .ok_or_else(|| ValidationError::new("price", "必须是有效数字"))?,
        };

        Self::new(username, userid, price)
    }
}

/// 将 JSON 值转换为有限的浮点数
///
/// 接受数字和数字字符串，`NaN`、无穷大及其他类型返回 `None`。
/// 符号不在这里检查。
pub fn coerce_price(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    price.is_finite().then_some(price)
}

// ---------------------------------------------------------------------------
// PurchaseEvent
// ---------------------------------------------------------------------------

/// 事件记录解析错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("记录不是合法的 JSON 对象: {0}")]
    InvalidJson(String),

    #[error("缺少必填字段: {0}")]
    MissingField(&'static str),

    #[error("字段 {field} 无效: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// 在 topic 上传输的购买事件
///
/// 序列化后恰好包含 `username`、`userid`、`price`、`timestamp` 四个字段，
/// 分区键为 `userid`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseEvent {
    pub username: String,
    pub userid: String,
    pub price: f64,
    #[serde(with = "iso8601_millis")]
    pub timestamp: DateTime<Utc>,
}

impl PurchaseEvent {
    /// 为购买意图打上事件时间（毫秒精度）
    pub fn stamp(intent: PurchaseIntent, now: DateTime<Utc>) -> Self {
        Self {
            username: intent.username,
            userid: intent.userid,
            price: intent.price,
            timestamp: now.trunc_subsecs(3),
        }
    }

    /// 分区路由键
    pub fn routing_key(&self) -> &str {
        &self.userid
    }

    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// 解析并校验一条原始记录
    ///
    /// `price: 0` 合法，只有缺失（或为 null）才算错误；负数、非有限数一律拒绝。
    /// 缺失或无法解析的 `timestamp` 同样拒绝，消费端从不补写事件时间。
    pub fn decode(raw: &[u8]) -> Result<Self, SchemaError> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| SchemaError::InvalidJson(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(SchemaError::InvalidJson("顶层不是对象".to_string()));
        };

        let username = required_string(&fields, "username")?;
        let userid = required_string(&fields, "userid")?;

        let price = match fields.get("price") {
            None | Some(Value::Null) => return Err(SchemaError::MissingField("price")),
            Some(value) => coerce_price(value).ok_or_else(|| SchemaError::InvalidField {
                field: "price",
                reason: format!("不是有效数字: {value}"),
            })?,
        };
        if price < 0.0 {
            return Err(SchemaError::InvalidField {
                field: "price",
                reason: format!("不能为负数: {price}"),
            });
        }

        let timestamp = match fields.get("timestamp") {
            None | Some(Value::Null) => return Err(SchemaError::MissingField("timestamp")),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| SchemaError::InvalidField {
                    field: "timestamp",
                    reason: e.to_string(),
                })?,
            Some(other) => {
                return Err(SchemaError::InvalidField {
                    field: "timestamp",
                    reason: format!("不是 ISO-8601 字符串: {other}"),
                });
            }
        };

        Ok(Self {
            username,
            userid,
            price,
            timestamp,
        })
    }
}

fn required_string(fields: &Map<String, Value>, field: &'static str) -> Result<String, SchemaError> {
    match fields.get(field) {
        None | Some(Value::Null) => Err(SchemaError::MissingField(field)),
        Some(Value::String(s)) if s.trim().is_empty() => Err(SchemaError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(SchemaError::InvalidField {
            field,
            reason: format!("不是字符串: {other}"),
        }),
    }
}

/// `2024-05-01T08:30:00.123Z` 格式
pub mod iso8601_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
