use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_ingest::cache::OrderCache;
use order_ingest::config::Config;
use order_ingest::db::{OrderRepository, PgOrderRepository};
use order_ingest::http::run_http_server;
use order_ingest::messaging::{KafkaSource, OrderConsumer, OrderIngestor};
use order_ingest::metrics::Metrics;
use order_ingest::service::OrderLookupService;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging, overridable with RUST_LOG
    // Example: RUST_LOG=order_ingest=trace cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_ingest=debug")),
        )
        .init();

    let config = Config::parse();

    // === 1. Connect to PostgreSQL ===
    tracing::info!("Connecting to PostgreSQL...");
    let repository = PgOrderRepository::connect(
        &config.db_url,
        config.db_max_connections,
        Duration::from_secs(5),
    )
    .await?;
    tracing::info!("Database connection successful");

    if config.migrate {
        repository.run_migrations().await?;
        tracing::info!("✅ Migrations completed. Exiting.");
        return Ok(());
    }

    tracing::info!("🚀 Starting order ingestion service");
    let repository: Arc<dyn OrderRepository> = Arc::new(repository);

    // === 2. Metrics and cache ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!(
        "📊 Metrics registry created with {} metrics",
        metrics.registry().gather().len()
    );

    let cache = Arc::new(OrderCache::new(config.cache_capacity)?);
    let lookup = Arc::new(OrderLookupService::new(
        cache.clone(),
        repository.clone(),
        metrics.clone(),
    ));

    if config.cache_warm_limit > 0 {
        if let Err(e) = lookup.warm_cache(config.cache_warm_limit).await {
            tracing::warn!(error = %e, "Cache warm-up failed, starting with an empty cache");
        }
    }

    // === 3. Broker consumer on its own thread ===
    let source = KafkaSource::new(
        &config.kafka_brokers,
        &config.kafka_topic,
        &config.kafka_group_id,
    )?;
    let ingestor = Arc::new(OrderIngestor::new(
        repository.clone(),
        cache.clone(),
        metrics.clone(),
        config.retry(),
    ));
    let consumer = OrderConsumer::new(
        source,
        ingestor,
        metrics.clone(),
        config.consumer_settings(),
    )
    .start()?;

    // === 4. HTTP API (runs until Ctrl+C / SIGTERM) ===
    let served = run_http_server(&config.http_addr, lookup, metrics).await;

    // === 5. Shutdown ===
    tracing::info!("Shutting down order consumer...");
    tokio::task::spawn_blocking(move || consumer.stop()).await?;
    tracing::info!("🛑 Service stopped");

    served?;
    Ok(())
}
