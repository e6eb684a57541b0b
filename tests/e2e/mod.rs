//! 购买事件链路端到端测试
//!
//! 需要运行中的 Kafka、PostgreSQL、purchase-gateway 与 purchase-management-service：
//!
//! ```text
//! cargo test --test e2e -- --ignored
//! ```
//!
//! 覆盖：
//! - 下单到查询的完整链路
//! - 同一用户事件的顺序
//! - 格式错误记录的跳过
//! - 查询参数校验与分页

pub mod helpers;
pub mod setup;
pub mod suites;

pub use setup::TestEnvironment;
