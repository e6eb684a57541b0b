//! 购买事件生产者
//!
//! 把已校验的购买事件以 `userid` 为分区键发布到 Kafka。同一用户的事件落在同一分区，
//! 保证消费端按发布顺序处理。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use purchase_shared::error::PurchaseError;
use purchase_shared::events::PurchaseEvent;
use purchase_shared::kafka::{DeliveryReceipt, KafkaProducer};
use purchase_shared::observability::metrics;
use tracing::{info, instrument, warn};

use crate::error::PublishError;

/// 事件发布接口，HTTP 层依赖该抽象以便脱离 broker 测试
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchasePublisher: Send + Sync {
    /// 发布一条事件，broker 确认后返回回执
    async fn publish(&self, event: &PurchaseEvent) -> Result<DeliveryReceipt, PublishError>;

    /// broker 是否可达
    async fn is_ready(&self) -> bool;
}

/// 基于 Kafka 的购买事件生产者
#[derive(Clone)]
pub struct PurchaseProducer {
    producer: KafkaProducer,
    topic: String,
}

impl PurchaseProducer {
    pub fn new(producer: KafkaProducer, topic: impl Into<String>) -> Self {
        Self {
            producer,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// 关闭前等待未完成的投递
    pub fn flush(&self, timeout: Duration) -> Result<(), PurchaseError> {
        self.producer.flush(timeout)
    }
}

#[async_trait]
impl PurchasePublisher for PurchaseProducer {
    #[instrument(skip(self, event), fields(userid = %event.userid))]
    async fn publish(&self, event: &PurchaseEvent) -> Result<DeliveryReceipt, PublishError> {
        let started = Instant::now();
        let key = event.routing_key();

        let result = match event.to_payload() {
            Ok(payload) => self
                .producer
                .send(&self.topic, key, &payload)
                .await
                .map_err(|e| PublishError::from_kafka(&self.topic, key, e)),
            Err(e) => Err(PublishError::Serialization(e)),
        };

        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(receipt) => {
                metrics::record_publish("success", elapsed);
                info!(
                    topic = %receipt.topic,
                    partition = receipt.partition,
                    offset = receipt.offset,
                    username = %event.username,
                    price = event.price,
                    "购买事件已发布"
                );
            }
            Err(e) => {
                metrics::record_publish(e.metric_label(), elapsed);
                warn!(
                    topic = %self.topic,
                    username = %event.username,
                    error = %e,
                    "购买事件发布失败"
                );
            }
        }

        result
    }

    async fn is_ready(&self) -> bool {
        self.producer.check_connectivity(&self.topic).await.is_ok()
    }
}
