//! 购买记录管理服务
//!
//! 以消费组成员身份从 Kafka 读取购买事件并写入 PostgreSQL，
//! 同时对外提供分页查询接口。
//!
//! ## 模块结构
//!
//! - `consumer`: 消费循环与逐条处置
//! - `ingest`: 解析、校验与持久化
//! - `repository`: PostgreSQL 与进程内仓储
//! - `service`: 分页查询
//! - `handlers` / `routes`: HTTP 接口

pub mod consumer;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

pub use consumer::PurchaseConsumer;
pub use error::{IngestError, ManagementError, QueryError, Result, StorageError};
pub use ingest::PurchaseIngestor;
pub use repository::{MemoryPurchaseRepository, PurchaseRepository, PurchaseRepositoryTrait};
pub use service::PurchaseQueryService;

/// 内嵌的数据库迁移
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
