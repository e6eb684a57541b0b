//! 领域模型

mod purchase;

pub use purchase::{NewPurchaseRecord, PurchaseId, PurchaseRecord};
