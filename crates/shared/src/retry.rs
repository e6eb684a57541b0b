//! 重试策略与执行器
//!
//! 指数退避用于两类场景：
//! - 进程启动时连接数据库等基础设施（有限次数，最终失败则退出进程）
//! - 消费者存储失败后的重新投递间隔（不设上限，记录永不丢弃）
//!
//! 参数无效等不可恢复错误不应被重试，由调用方通过 `is_retryable` 闭包控制。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

// ---------------------------------------------------------------------------
// RetryPolicy: 重试策略配置
// ---------------------------------------------------------------------------

/// 重试策略配置
///
/// 第 N 次重试前等待 `initial_delay * multiplier^N`，不超过 `max_delay`。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次执行），`None` 表示不限次数
    pub max_retries: Option<u32>,
    /// 首次重试前的等待时间
    pub initial_delay: Duration,
    /// 退避时间上限
    pub max_delay: Duration,
    /// 每次重试的退避倍数
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    /// 最多重试 3 次，初始等待 1 秒，最大等待 30 秒，倍数 2.0
    fn default() -> Self {
        Self {
            max_retries: Some(3),
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 消费端重新投递策略：100ms 起步，翻倍，30 秒封顶，不限次数
    pub fn redelivery() -> Self {
        Self {
            max_retries: None,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    /// 计算第 N 次重试的等待时间（attempt 从 0 开始）
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = base_ms * self.multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// attempt 表示已经失败的次数，未设上限时总是返回 true
    pub fn should_retry(&self, attempt: u32) -> bool {
        match self.max_retries {
            Some(max) => attempt < max,
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// retry_with_policy: 带重试的异步执行器
// ---------------------------------------------------------------------------

/// 带重试的异步执行器
///
/// 仅在操作返回可重试错误时才重试，其余错误直接向上传播。
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt, "操作在重试后成功");
                }
                return Ok(value);
            }
            Err(err) => {
                if !is_retryable(&err) {
                    warn!(
                        operation = operation_name,
                        error = %err,
                        "操作失败且不可重试，直接返回错误"
                    );
                    return Err(err);
                }

                if !policy.should_retry(attempt) {
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_retries = ?policy.max_retries,
                        error = %err,
                        "已达最大重试次数，放弃重试"
                    );
                    return Err(err);
                }

                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "操作失败，将在退避后重试"
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
