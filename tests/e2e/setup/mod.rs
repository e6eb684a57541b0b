//! 测试环境初始化

mod environment;

pub use environment::*;
