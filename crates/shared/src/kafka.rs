//! Kafka 基础设施封装
//!
//! 将 rdkafka 的底层 API 封装为业务友好的 Producer/Consumer 抽象，
//! 统一投递配置、错误映射、位点提交和优雅关闭语义。
//!
//! 投递语义：
//! - 生产者开启幂等且单飞行请求，重试不会在 broker 端产生重复记录
//! - 消费者关闭自动提交，只有处理函数返回 `Commit` 才提交位点；
//!   返回 `Redeliver` 时回拨到该条记录并退避等待，实现至少一次投递

use std::collections::HashSet;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::KafkaConfig;
use crate::error::PurchaseError;
use crate::retry::RetryPolicy;

mod offsets;

pub use rdkafka::consumer::CommitMode as OffsetCommitMode;

pub use offsets::{
    LoopControl, OffsetControl, PartitionProgress, RedeliveryTracker, SEEK_ATTEMPTS,
};

/// 元数据查询的超时
const CLIENT_OP_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// 客户端配置
// ---------------------------------------------------------------------------

/// 构造生产者配置
///
/// `message.timeout.ms` 取发布超时：超时后投递以错误结束，而不是无限等待。
pub fn producer_client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.brokers)
        .set("client.id", &config.client_id)
        .set("enable.idempotence", "true")
        .set("max.in.flight.requests.per.connection", "1")
        .set("acks", "all")
        .set("message.timeout.ms", config.publish_timeout_ms.to_string());
    client
}

/// 构造消费者配置
///
/// 自动提交与自动存储位点均关闭，位点完全由消费循环显式提交。
pub fn consumer_client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.brokers)
        .set("client.id", &config.client_id)
        .set("group.id", &config.consumer_group)
        .set("auto.offset.reset", &config.auto_offset_reset)
        .set("enable.auto.commit", "false")
        .set("enable.auto.offset.store", "false")
        .set("allow.auto.create.topics", "false")
        .set("session.timeout.ms", config.session_timeout_ms.to_string())
        .set(
            "heartbeat.interval.ms",
            config.heartbeat_interval_ms.to_string(),
        );
    client
}

// ---------------------------------------------------------------------------
// KafkaProducer
// ---------------------------------------------------------------------------

/// 一次成功投递的回执
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// 面向业务的 Kafka 生产者
///
/// 内部的 `FutureProducer` 是 Arc 包装的，Clone 开销很小。
#[derive(Clone)]
pub struct KafkaProducer {
    producer: FutureProducer,
    publish_timeout: Duration,
}

impl KafkaProducer {
    /// 根据配置创建生产者
    pub fn new(config: &KafkaConfig) -> Result<Self, PurchaseError> {
        let producer: FutureProducer = producer_client_config(config)
            .create()
            .map_err(|e| PurchaseError::Kafka(format!("创建生产者失败: {e}")))?;

        info!(
            brokers = %config.brokers,
            publish_timeout_ms = config.publish_timeout_ms,
            "Kafka 生产者已初始化（幂等投递）"
        );
        Ok(Self {
            producer,
            publish_timeout: config.publish_timeout(),
        })
    }

    /// 发送原始字节消息，等待 broker 确认
    pub async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<DeliveryReceipt, PurchaseError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        let delivery = self
            .producer
            .send(record, self.publish_timeout)
            .await
            .map_err(|(e, _)| map_send_error(topic, e))?;

        debug!(
            topic,
            key,
            partition = delivery.partition,
            offset = delivery.offset,
            "消息已发送"
        );
        Ok(DeliveryReceipt {
            topic: topic.to_string(),
            partition: delivery.partition,
            offset: delivery.offset,
        })
    }

    /// 探测 broker 是否可达，并确认 topic 存在
    pub async fn check_connectivity(&self, topic: &str) -> Result<(), PurchaseError> {
        let producer = self.producer.clone();
        let topic = topic.to_string();

        tokio::task::spawn_blocking(move || {
            let metadata = producer
                .client()
                .fetch_metadata(Some(&topic), CLIENT_OP_TIMEOUT)
                .map_err(|e| PurchaseError::Kafka(format!("获取元数据失败: {e}")))?;

            match metadata.topics().iter().find(|t| t.name() == topic) {
                Some(t) if t.error().is_none() => Ok(()),
                Some(t) => Err(PurchaseError::Kafka(format!(
                    "topic {topic} 不可用: {:?}",
                    t.error()
                ))),
                None => Err(PurchaseError::Kafka(format!("topic {topic} 不存在"))),
            }
        })
        .await
        .map_err(|e| PurchaseError::Internal(format!("元数据任务失败: {e}")))?
    }

    /// 等待内部队列中的消息全部投递完成（关闭时调用，会阻塞当前线程）
    pub fn flush(&self, timeout: Duration) -> Result<(), PurchaseError> {
        self.producer
            .flush(timeout)
            .map_err(|e| PurchaseError::Kafka(format!("flush 失败: {e}")))
    }
}

fn map_send_error(topic: &str, err: KafkaError) -> PurchaseError {
    match err.rdkafka_error_code() {
        Some(RDKafkaErrorCode::MessageTimedOut) => PurchaseError::KafkaTimeout {
            topic: topic.to_string(),
        },
        _ => PurchaseError::Kafka(format!("发送消息失败: {err}")),
    }
}

// ---------------------------------------------------------------------------
// ConsumerMessage
// ---------------------------------------------------------------------------

/// 消费到的 Kafka 消息的统一表示
///
/// 将 rdkafka 的 `BorrowedMessage`（带生命周期约束）转换为拥有所有权的结构体，
/// 使消息可以安全地跨 await 点传递给异步处理函数。
#[derive(Debug, Clone)]
pub struct ConsumerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub timestamp: Option<i64>,
}

impl ConsumerMessage {
    fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        let key = msg
            .key()
            .and_then(|k| std::str::from_utf8(k).ok())
            .map(String::from);

        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key,
            payload: msg.payload().map(|p| p.to_vec()).unwrap_or_default(),
            timestamp: msg.timestamp().to_millis(),
        }
    }
}

// ---------------------------------------------------------------------------
// 消费者状态与处理结果
// ---------------------------------------------------------------------------

/// 消费者订阅生命周期
///
/// `Disconnected → Connected → Subscribed → Running ⇄ Error → Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connected,
    Subscribed,
    Running,
    Error,
}

impl ConsumerState {
    /// 任何已连接状态都可以直接回到 Disconnected（关闭）
    pub fn can_transition_to(self, next: ConsumerState) -> bool {
        use ConsumerState::*;
        matches!(
            (self, next),
            (Disconnected, Connected)
                | (Connected, Subscribed)
                | (Subscribed, Running)
                | (Running, Error)
                | (Error, Running)
                | (Connected | Subscribed | Running | Error, Disconnected)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Subscribed => "subscribed",
            Self::Running => "running",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 处理函数对一条消息的处置结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDisposition {
    /// 已持久化或已确定跳过，提交位点
    Commit,
    /// 暂时性失败，回拨位点后重新投递
    Redeliver,
}

// ---------------------------------------------------------------------------
// KafkaConsumer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 消费者
///
/// 封装 `StreamConsumer`，通过 `watch` channel 对外暴露订阅状态，
/// 并提供基于关闭信号的优雅退出。
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    state: watch::Sender<ConsumerState>,
    group_id: String,
}

impl KafkaConsumer {
    /// 创建消费者并加入配置中的消费组
    pub fn new(config: &KafkaConfig) -> Result<Self, PurchaseError> {
        let consumer: StreamConsumer = consumer_client_config(config)
            .create()
            .map_err(|e| PurchaseError::Kafka(format!("创建消费者失败: {e}")))?;

        let (state, _) = watch::channel(ConsumerState::Disconnected);
        let this = Self {
            consumer,
            state,
            group_id: config.consumer_group.clone(),
        };
        this.transition(ConsumerState::Connected);

        info!(brokers = %config.brokers, group_id = %this.group_id, "Kafka 消费者已初始化");
        Ok(this)
    }

    /// 订阅状态的只读视图
    pub fn state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    fn current_state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    fn transition(&self, next: ConsumerState) {
        let current = self.current_state();
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "忽略非法的消费者状态转换");
            return;
        }
        self.state.send_replace(next);
        debug!(from = %current, to = %next, "消费者状态变更");
    }

    /// 订阅指定的 topic 列表
    pub fn subscribe(&self, topics: &[&str]) -> Result<(), PurchaseError> {
        self.consumer
            .subscribe(topics)
            .map_err(|e| PurchaseError::Kafka(format!("订阅 topic 失败: {e}")))?;

        self.transition(ConsumerState::Subscribed);
        info!(?topics, group_id = %self.group_id, "已订阅 Kafka topics");
        Ok(())
    }

    /// 启动消费循环
    ///
    /// 同一时刻只处理一条消息，分区内严格按投递顺序推进，位点由 [`PartitionProgress`] 决定：
    /// - handler 返回 `Commit`：提交 `offset + 1`
    /// - handler 返回 `Redeliver`：把分区回拨到该条记录，按 `redelivery` 策略退避后重新消费
    ///
    /// 关闭信号变为 `true` 时停止拉取新消息，同步提交已确认的位点并退订。
    /// 回拨多次失败时同样关闭，并返回错误，未持久化的记录由下次加入消费组时重新投递。
    pub async fn start<F, Fut>(
        self,
        mut shutdown: watch::Receiver<bool>,
        redelivery: RetryPolicy,
        handler: F,
    ) -> Result<(), PurchaseError>
    where
        F: Fn(ConsumerMessage) -> Fut,
        Fut: std::future::Future<Output = MessageDisposition>,
    {
        use futures::StreamExt;

        let mut progress = PartitionProgress::new(redelivery);
        let mut outcome = Ok(());

        let stream = self.consumer.stream();
        futures::pin_mut!(stream);

        self.transition(ConsumerState::Running);
        info!(group_id = %self.group_id, "Kafka 消费循环已启动");

        loop {
            let msg = tokio::select! {
                // 偏向关闭信号，保证收到关闭时能尽快退出
                biased;

                changed = shutdown.changed() => {
                    // 发送端被丢弃同样视为关闭
                    if changed.is_err() || *shutdown.borrow() {
                        info!("收到关闭信号，Kafka 消费循环退出");
                        break;
                    }
                    continue;
                }

                msg_result = stream.next() => match msg_result {
                    Some(Ok(borrowed_msg)) => ConsumerMessage::from_borrowed(&borrowed_msg),
                    Some(Err(e)) => {
                        error!(error = %e, "接收 Kafka 消息出错");
                        self.transition(ConsumerState::Error);
                        continue;
                    }
                    None => {
                        warn!("Kafka 消息流意外结束");
                        break;
                    }
                },
            };

            if self.current_state() == ConsumerState::Error {
                self.transition(ConsumerState::Running);
            }

            let topic = msg.topic.clone();
            let (partition, offset) = (msg.partition, msg.offset);
            debug!(%topic, partition, offset, "收到 Kafka 消息");

            let flow = match progress.rewind_target(&topic, partition, offset) {
                Some(target) => {
                    progress
                        .realign(&self.consumer, &topic, partition, target, &mut shutdown)
                        .await
                }
                None => {
                    let disposition = handler(msg).await;
                    progress
                        .settle(&self.consumer, &topic, partition, offset, disposition, &mut shutdown)
                        .await
                }
            };

            match flow {
                LoopControl::Continue => {}
                LoopControl::Shutdown => break,
                LoopControl::Stalled {
                    topic,
                    partition,
                    offset,
                } => {
                    outcome = Err(PurchaseError::Kafka(format!(
                        "分区 {topic}/{partition} 无法回拨到位点 {offset}"
                    )));
                    break;
                }
            }
        }

        self.close(&progress);
        outcome
    }

    /// 同步提交已确认的位点，退订并释放消费组成员身份
    ///
    /// 只提交仍分配给本成员的分区，已被重新分配的分区不回写旧位点。
    fn close(&self, progress: &PartitionProgress) {
        match self.consumer.assignment() {
            Ok(tpl) => {
                let assigned: HashSet<(String, i32)> = tpl
                    .elements()
                    .iter()
                    .map(|e| (e.topic().to_string(), e.partition()))
                    .collect();

                for (topic, partition, next_offset) in progress.positions_to_commit(&assigned) {
                    let result = OffsetControl::commit(
                        &self.consumer,
                        &topic,
                        partition,
                        next_offset,
                        CommitMode::Sync,
                    );
                    if let Err(e) = result {
                        warn!(%topic, partition, next_offset, error = %e, "关闭时提交位点失败");
                    }
                }
            }
            Err(e) => warn!(error = %e, "获取分区分配失败，跳过关闭时的同步提交"),
        }

        self.consumer.unsubscribe();
        self.transition(ConsumerState::Disconnected);
        info!(group_id = %self.group_id, "Kafka 消费者已断开");
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
