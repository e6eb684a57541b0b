//! 测试套件模块

pub mod purchase_flow;
pub mod query_api;
