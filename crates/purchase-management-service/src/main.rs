//! 购买记录管理服务
//!
//! 后台消费购买事件并落库，前台提供查询接口。

use std::sync::Arc;

use axum::middleware;
use purchase_management::{
    MIGRATOR, PurchaseConsumer, PurchaseIngestor, PurchaseRepository, PurchaseRepositoryTrait,
    routes, state::AppState,
};
use purchase_shared::{
    config::AppConfig,
    database::Database,
    observability::{self, middleware as obs_middleware},
    retry::RetryPolicy,
    server,
};
use tokio::net::TcpListener;
use tokio::sync::{Notify, watch};
use tracing::{error, info};

const SERVICE_NAME: &str = "purchase-management-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let obs_config = config.observability.clone().with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting {} on {}", SERVICE_NAME, config.server_addr());

    let db = Database::connect_with_retry(&config.database, &RetryPolicy::default()).await?;
    db.run_migrations(&MIGRATOR).await?;

    let repository: Arc<dyn PurchaseRepositoryTrait> =
        Arc::new(PurchaseRepository::new(db.pool().clone()));

    let consumer = PurchaseConsumer::new(&config.kafka, PurchaseIngestor::new(repository.clone()))?;
    let state = AppState::new(repository, consumer.state());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_failed = Arc::new(Notify::new());
    let consumer_handle = tokio::spawn({
        let consumer_failed = consumer_failed.clone();
        async move {
            if let Err(e) = consumer.run(shutdown_rx).await {
                error!(error = %e, "购买事件消费者异常退出，停止服务");
                consumer_failed.notify_one();
            }
        }
    });

    let app = routes::app(state)
        .layer(server::cors_layer(&config.server))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = server::shutdown_signal() => {}
                _ = consumer_failed.notified() => {}
            }
        })
        .await?;

    // 通知消费者停止，等待其提交位点并退订
    let _ = shutdown_tx.send(true);
    if let Err(e) = consumer_handle.await {
        error!(error = %e, "等待消费者退出失败");
    }

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}
