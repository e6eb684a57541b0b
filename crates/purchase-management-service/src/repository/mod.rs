//! 数据库仓储层
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - PostgreSQL 与进程内两种实现共享同一个 trait，服务层依赖抽象

mod memory_repo;
mod purchase_repo;
mod traits;

pub use memory_repo::MemoryPurchaseRepository;
pub use purchase_repo::PurchaseRepository;
pub use traits::*;
