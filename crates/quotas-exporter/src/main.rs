//! AWS Quotas Exporter Binary

use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::Registry;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quotas_exporter::{
    aws, server, CacheCollector, CacheConfig, ExporterConfig, ExporterMetrics, MetricCache,
    RefreshScheduler, EXPORTER_VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting AWS Quotas Exporter v{}", EXPORTER_VERSION);

    // Load configuration
    let config = ExporterConfig::load()?;
    let partition = config.validate()?;
    let tag_labels = config.tag_labels()?;
    info!(
        region = %config.region,
        partition = %partition,
        refresh_period_secs = config.refresh_period_secs,
        tags = ?tag_labels,
        "Loaded configuration"
    );

    let sdk_config = aws::load_sdk_config(&config.region, config.profile.as_deref()).await;
    let quotas = aws::service_quotas(&sdk_config, &config.region)?;

    let (cache, bootstrap) = MetricCache::start(
        CacheConfig::new(config.region.clone()).with_tag_labels(tag_labels),
        Arc::new(quotas),
    );

    let metrics = ExporterMetrics::new()?;
    let refresher = RefreshScheduler::new(cache.clone(), config.refresh_period())
        .with_metrics(metrics.clone())
        .start();

    // No metric schema can be served without a successful bootstrap
    bootstrap
        .await
        .context("bootstrap task panicked")?
        .context("could not retrieve quotas and limits")?;

    // Registration calls desc(), which only returns once the cache is ready
    let registry = Registry::new();
    metrics.register(&registry)?;
    registry.register(Box::new(CacheCollector::new(cache.clone())))?;
    info!(metrics = cache.len(), "Registered quota metrics");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Received shutdown signal");
    };

    server::serve(config.port, registry, shutdown).await?;

    refresher.abort();
    info!("Shutting down...");
    Ok(())
}
