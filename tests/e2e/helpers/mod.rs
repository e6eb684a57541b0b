//! 测试辅助工具模块
//!
//! 提供 HTTP 客户端、Kafka 工具与数据库验证。

mod api_client;
mod db_verifier;
mod kafka_helper;

pub use api_client::*;
pub use db_verifier::*;
pub use kafka_helper::*;
