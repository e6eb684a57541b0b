//! 业务服务层

mod query_service;

pub use query_service::PurchaseQueryService;
