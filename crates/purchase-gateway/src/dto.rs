//! 请求与响应 DTO

use purchase_shared::events::PurchaseEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `POST /api/buy` 请求体
///
/// 字段全部可选，缺失字段由校验逻辑给出具体的字段级错误；
/// `price` 保留原始 JSON 值以接受数字字符串。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuyRequest {
    pub username: Option<String>,
    pub userid: Option<String>,
    pub price: Option<Value>,
}

/// `POST /api/buy` 成功响应
#[derive(Debug, Serialize, Deserialize)]
pub struct BuyResponse {
    pub message: String,
    pub purchase: PurchaseEvent,
}

impl BuyResponse {
    pub fn accepted(purchase: PurchaseEvent) -> Self {
        Self {
            message: "Purchase request submitted successfully".to_string(),
            purchase,
        }
    }
}
