//! 共享库
//!
//! 包含网关与管理服务共用的配置、错误处理、数据库连接、Kafka、事件模型与查询模型。

pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod kafka;
pub mod observability;
pub mod query;
pub mod retry;
pub mod server;
