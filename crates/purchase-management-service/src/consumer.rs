//! 购买事件消费者
//!
//! 以单个工作者加入消费组，逐条处理 Kafka 投递的购买事件。
//! 同一分区内严格按顺序推进，因此同一 userid 的事件按发布顺序落库。

use purchase_shared::config::KafkaConfig;
use purchase_shared::error::PurchaseError;
use purchase_shared::kafka::{ConsumerMessage, ConsumerState, KafkaConsumer, MessageDisposition};
use purchase_shared::observability::metrics;
use purchase_shared::retry::RetryPolicy;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::IngestError;
use crate::ingest::{PurchaseIngestor, disposition};
use crate::repository::PurchaseRepositoryTrait;

pub struct PurchaseConsumer<R: PurchaseRepositoryTrait + ?Sized> {
    consumer: KafkaConsumer,
    ingestor: PurchaseIngestor<R>,
    topic: String,
    redelivery: RetryPolicy,
}

impl<R: PurchaseRepositoryTrait + ?Sized> PurchaseConsumer<R> {
    pub fn new(config: &KafkaConfig, ingestor: PurchaseIngestor<R>) -> Result<Self, PurchaseError> {
        Ok(Self {
            consumer: KafkaConsumer::new(config)?,
            ingestor,
            topic: config.topic.clone(),
            redelivery: RetryPolicy::redelivery(),
        })
    }

    /// 订阅状态，供就绪探针使用
    pub fn state(&self) -> watch::Receiver<ConsumerState> {
        self.consumer.state()
    }

    /// 启动消费循环，直到收到 shutdown 信号
    ///
    /// 分区无法回拨时返回错误，调用方应停止服务让消费组重新分配分区。
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), PurchaseError> {
        let Self {
            consumer,
            ingestor,
            topic,
            redelivery,
        } = self;

        consumer.subscribe(&[topic.as_str()])?;
        info!(%topic, "购买事件消费者已启动");

        let ingestor = &ingestor;
        let result = consumer
            .start(shutdown, redelivery, move |msg| async move {
                handle_message(ingestor, &msg).await
            })
            .await;

        info!("购买事件消费者已停止");
        result
    }
}

/// 处理单条 Kafka 消息并给出位点处置
///
/// 拆分为独立函数，便于在测试中脱离 broker 直接调用。
pub async fn handle_message<R: PurchaseRepositoryTrait + ?Sized>(
    ingestor: &PurchaseIngestor<R>,
    msg: &ConsumerMessage,
) -> MessageDisposition {
    let result = ingestor.ingest(&msg.payload).await;

    match &result {
        Ok(_) => metrics::record_ingest("persisted"),
        Err(IngestError::Malformed(e)) => {
            metrics::record_ingest("skipped");
            warn!(
                topic = %msg.topic,
                partition = msg.partition,
                offset = msg.offset,
                key = msg.key.as_deref().unwrap_or_default(),
                error = %e,
                "记录格式错误，跳过"
            );
        }
        Err(IngestError::StorageFailure(e)) => {
            metrics::record_ingest("storage_failure");
            error!(
                topic = %msg.topic,
                partition = msg.partition,
                offset = msg.offset,
                key = msg.key.as_deref().unwrap_or_default(),
                error = %e,
                "写入存储失败，等待重新投递"
            );
        }
    }

    disposition(&result)
}
