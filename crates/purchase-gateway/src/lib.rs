//! 购买网关服务（面向客户端）
//!
//! - `POST /api/buy`：校验购买请求，打上事件时间后发布到 Kafka
//! - `GET /api/purchases`：校验分页参数后转发给管理服务
//!
//! ## 模块结构
//!
//! - `producer`: 购买事件发布（幂等投递，按 userid 分区）
//! - `upstream`: 管理服务 HTTP 客户端
//! - `handlers` / `routes` / `state`: HTTP 层
//! - `error`: 发布错误与 HTTP 错误映射

pub mod dto;
pub mod error;
pub mod handlers;
pub mod producer;
pub mod routes;
pub mod state;
pub mod upstream;

pub use error::{GatewayError, PublishError, Result};
pub use producer::{PurchaseProducer, PurchasePublisher};
pub use state::AppState;
pub use upstream::ManagementApiClient;
