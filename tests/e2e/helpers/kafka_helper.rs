//! Kafka 辅助工具
//!
//! 绕过网关直接向 topic 写入原始记录，用于构造格式错误的输入。

use anyhow::{Result, anyhow};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;

pub struct KafkaHelper {
    producer: FutureProducer,
    topic: String,
}

impl KafkaHelper {
    pub fn new(brokers: &str, topic: &str) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }

    /// 写入一条原始记录
    pub async fn send_raw(&self, key: &str, payload: &[u8]) -> Result<()> {
        let record = FutureRecord::to(&self.topic).key(key).payload(payload);
        self.producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| anyhow!("发送原始记录失败: {e}"))?;
        Ok(())
    }
}
