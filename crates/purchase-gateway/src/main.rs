//! 购买网关服务
//!
//! 接收购买请求并发布到 Kafka，同时代理查询请求到管理服务。

use std::sync::Arc;
use std::time::Duration;

use axum::middleware;
use purchase_gateway::{ManagementApiClient, PurchaseProducer, PurchasePublisher, routes, state::AppState};
use purchase_shared::{
    config::AppConfig,
    kafka::KafkaProducer,
    observability::{self, middleware as obs_middleware},
    server,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

const SERVICE_NAME: &str = "purchase-gateway";
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let obs_config = config.observability.clone().with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    let producer = PurchaseProducer::new(KafkaProducer::new(&config.kafka)?, &config.kafka.topic);

    // broker 暂不可达不阻止启动，就绪探针会如实反映
    if !producer.is_ready().await {
        warn!(
            brokers = %config.kafka.brokers,
            topic = %config.kafka.topic,
            "Kafka 暂不可达，购买请求将返回 503 直到 broker 恢复"
        );
    }

    let management_api = ManagementApiClient::new(&config.management_api)?;
    info!(url = %management_api.purchases_url(), "查询请求将转发到管理服务");

    let state = AppState::new(Arc::new(producer.clone()), management_api);

    let app = routes::app(state)
        .layer(server::cors_layer(&config.server))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    // 等待仍在队列中的投递完成
    let flushed = tokio::task::spawn_blocking(move || producer.flush(FLUSH_TIMEOUT)).await?;
    if let Err(e) = flushed {
        warn!(error = %e, "关闭前 flush 生产者失败");
    }

    info!("Server shutdown complete");

    Ok(())
}
