//! HTTP 请求处理器

pub mod buy;
pub mod health;
pub mod purchases;
