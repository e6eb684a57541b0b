//! 消费位点推进
//!
//! 消费循环把每条消息的处置结果交给 [`PartitionProgress`]，由它决定提交还是回拨。
//! 分区上有记录等待重新投递时，该分区的位点不会越过这条记录。

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rdkafka::Offset;
use rdkafka::TopicPartitionList;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::MessageDisposition;
use crate::error::PurchaseError;
use crate::retry::RetryPolicy;

/// 回拨失败后的最大尝试次数，超过后停止消费
pub const SEEK_ATTEMPTS: u32 = 3;

/// 位点控制：提交与回拨
///
/// 消费循环只通过这两个操作移动位点。
pub trait OffsetControl {
    /// 提交下一条待消费的位点
    fn commit(
        &self,
        topic: &str,
        partition: i32,
        next_offset: i64,
        mode: CommitMode,
    ) -> Result<(), PurchaseError>;

    /// 把分区的拉取位置移回到指定位点
    fn seek(&self, topic: &str, partition: i32, offset: i64) -> Result<(), PurchaseError>;
}

impl OffsetControl for StreamConsumer {
    fn commit(
        &self,
        topic: &str,
        partition: i32,
        next_offset: i64,
        mode: CommitMode,
    ) -> Result<(), PurchaseError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(topic, partition, Offset::Offset(next_offset))
            .and_then(|_| Consumer::commit(self, &tpl, mode))
            .map_err(|e| PurchaseError::Kafka(format!("提交位点失败: {e}")))
    }

    /// 零超时：librdkafka 异步执行回拨，不阻塞运行时线程
    fn seek(&self, topic: &str, partition: i32, offset: i64) -> Result<(), PurchaseError> {
        Consumer::seek(
            self,
            topic,
            partition,
            Offset::Offset(offset),
            Duration::ZERO,
        )
        .map_err(|e| PurchaseError::Kafka(format!("回拨位点失败: {e}")))
    }
}

/// 一条消息处置完之后消费循环的走向
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    /// 收到关闭信号
    Shutdown,
    /// 多次回拨失败，分区无法安全推进
    Stalled {
        topic: String,
        partition: i32,
        offset: i64,
    },
}

/// 记录每个分区上同一位点的连续失败次数，用于计算重新投递的退避时间
#[derive(Debug)]
pub struct RedeliveryTracker {
    policy: RetryPolicy,
    failures: HashMap<(String, i32), (i64, u32)>,
}

impl RedeliveryTracker {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: HashMap::new(),
        }
    }

    /// 记录一次失败并返回重新投递前应等待的时间
    ///
    /// 重新投递没有次数上限，记录不会被丢弃。
    pub fn record_failure(&mut self, topic: &str, partition: i32, offset: i64) -> Duration {
        let entry = self
            .failures
            .entry((topic.to_string(), partition))
            .or_insert((offset, 0));

        if entry.0 != offset {
            *entry = (offset, 0);
        }

        let delay = self.policy.delay_for_attempt(entry.1);
        entry.1 = entry.1.saturating_add(1);
        delay
    }

    /// 分区上的记录处理成功后清空失败计数
    pub fn record_success(&mut self, topic: &str, partition: i32) {
        self.failures.remove(&(topic.to_string(), partition));
    }

    /// 指定位点已经连续失败的次数
    pub fn attempts(&self, topic: &str, partition: i32, offset: i64) -> u32 {
        match self.failures.get(&(topic.to_string(), partition)) {
            Some((failed_offset, count)) if *failed_offset == offset => *count,
            _ => 0,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

/// 各分区的消费进度
///
/// - `committed`：已确认可提交的下一位点
/// - `pending`：等待重新投递的记录位点，存在时该分区只接受这一条记录
#[derive(Debug)]
pub struct PartitionProgress {
    tracker: RedeliveryTracker,
    committed: HashMap<(String, i32), i64>,
    pending: HashMap<(String, i32), i64>,
}

impl PartitionProgress {
    pub fn new(redelivery: RetryPolicy) -> Self {
        Self {
            tracker: RedeliveryTracker::new(redelivery),
            committed: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    /// 消息越过了分区上等待重新投递的记录时，返回应回拨到的位点
    ///
    /// 返回 `Some` 的消息不能交给处理函数，也不能提交。
    pub fn rewind_target(&self, topic: &str, partition: i32, offset: i64) -> Option<i64> {
        self.pending
            .get(&(topic.to_string(), partition))
            .copied()
            .filter(|pending| *pending != offset)
    }

    pub fn committed_offset(&self, topic: &str, partition: i32) -> Option<i64> {
        self.committed.get(&(topic.to_string(), partition)).copied()
    }

    pub fn pending_offset(&self, topic: &str, partition: i32) -> Option<i64> {
        self.pending.get(&(topic.to_string(), partition)).copied()
    }

    /// 按处置结果推进分区
    ///
    /// `Commit` 提交 `offset + 1`；`Redeliver` 把分区回拨到该记录并按退避策略等待。
    pub async fn settle<C: OffsetControl + ?Sized>(
        &mut self,
        control: &C,
        topic: &str,
        partition: i32,
        offset: i64,
        disposition: MessageDisposition,
        shutdown: &mut watch::Receiver<bool>,
    ) -> LoopControl {
        match disposition {
            MessageDisposition::Commit => {
                let key = (topic.to_string(), partition);
                self.pending.remove(&key);
                self.tracker.record_success(topic, partition);

                if let Err(e) = control.commit(topic, partition, offset + 1, CommitMode::Async) {
                    // 记录已处理，关闭时还会再同步提交一次
                    warn!(topic, partition, next_offset = offset + 1, error = %e, "提交位点失败");
                }
                self.committed.insert(key, offset + 1);
                LoopControl::Continue
            }
            MessageDisposition::Redeliver => {
                self.pending.insert((topic.to_string(), partition), offset);
                let delay = self.tracker.record_failure(topic, partition, offset);
                warn!(
                    topic,
                    partition,
                    offset,
                    attempt = self.tracker.attempts(topic, partition, offset),
                    delay_ms = delay.as_millis() as u64,
                    "消息处理失败，回拨位点等待重新投递"
                );
                self.rewind(control, topic, partition, offset, delay, shutdown)
                    .await
            }
        }
    }

    /// 丢弃越过待重投记录的消息，把分区重新回拨到该记录
    pub async fn realign<C: OffsetControl + ?Sized>(
        &mut self,
        control: &C,
        topic: &str,
        partition: i32,
        target: i64,
        shutdown: &mut watch::Receiver<bool>,
    ) -> LoopControl {
        debug!(topic, partition, target, "分区存在待重投记录，丢弃越过的消息");
        let delay = self.tracker.policy().initial_delay;
        self.rewind(control, topic, partition, target, delay, shutdown)
            .await
    }

    /// 回拨并等待；回拨失败时在退避期间重试
    async fn rewind<C: OffsetControl + ?Sized>(
        &self,
        control: &C,
        topic: &str,
        partition: i32,
        offset: i64,
        delay: Duration,
        shutdown: &mut watch::Receiver<bool>,
    ) -> LoopControl {
        let mut attempt = 1;
        loop {
            match control.seek(topic, partition, offset) {
                Ok(()) => break,
                Err(e) if attempt < SEEK_ATTEMPTS => {
                    warn!(topic, partition, offset, attempt, error = %e, "回拨位点失败，退避后重试");
                }
                Err(e) => {
                    error!(topic, partition, offset, attempt, error = %e, "回拨位点多次失败，停止消费");
                    return LoopControl::Stalled {
                        topic: topic.to_string(),
                        partition,
                        offset,
                    };
                }
            }

            if backoff(delay, shutdown).await == LoopControl::Shutdown {
                return LoopControl::Shutdown;
            }
            attempt += 1;
        }

        backoff(delay, shutdown).await
    }

    /// 关闭时需要同步提交的位点，只包含当前仍分配给本成员的分区
    pub fn positions_to_commit(
        &self,
        assigned: &HashSet<(String, i32)>,
    ) -> Vec<(String, i32, i64)> {
        let mut positions: Vec<_> = self
            .committed
            .iter()
            .filter(|(key, _)| assigned.contains(*key))
            .map(|((topic, partition), next)| (topic.clone(), *partition, *next))
            .collect();
        positions.sort();
        positions
    }
}

/// 可被关闭信号打断的等待
async fn backoff(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> LoopControl {
    tokio::select! {
        biased;
        changed = shutdown.changed() => {
            if changed.is_err() || *shutdown.borrow() {
                info!("退避期间收到关闭信号，Kafka 消费循环退出");
                return LoopControl::Shutdown;
            }
            LoopControl::Continue
        }
        _ = tokio::time::sleep(delay) => LoopControl::Continue,
    }
}
