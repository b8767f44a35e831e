//! Refresh Scheduler
//!
//! Long-lived loop that waits for the cache to become ready, then refreshes
//! it once per period for the lifetime of the process. Refresh failures are
//! logged and counted; the previous snapshot stays authoritative.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::cache::MetricCache;
use crate::metrics::ExporterMetrics;

/// Default refresh period
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(360);

/// Drives periodic cache refreshes
pub struct RefreshScheduler {
    cache: Arc<MetricCache>,
    period: Duration,
    metrics: Option<ExporterMetrics>,
}

impl RefreshScheduler {
    pub fn new(cache: Arc<MetricCache>, period: Duration) -> Self {
        Self {
            cache,
            period,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ExporterMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Spawn the refresh loop
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        self.cache.wait_ready().await;
        if let Some(metrics) = &self.metrics {
            metrics.cached_metrics.set(self.cache.len() as i64);
        }
        info!(period_secs = self.period.as_secs(), "Starting refresh loop");

        let start = tokio::time::Instant::now() + self.period;
        let mut interval = tokio::time::interval_at(start, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            self.refresh_once().await;
        }
    }

    /// Run a single refresh cycle; returns whether it succeeded
    pub async fn refresh_once(&self) -> bool {
        let started = Instant::now();
        let result = self.cache.refresh().await;
        let elapsed = started.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.refresh_total.inc();
            metrics.refresh_duration_seconds.observe(elapsed.as_secs_f64());
            if result.is_err() {
                metrics.refresh_errors_total.inc();
            }
        }

        match result {
            Ok(updated) => {
                info!(updated, elapsed_ms = elapsed.as_millis() as u64, "Refreshed quotas");
                true
            }
            Err(e) => {
                error!(error = %e, "Could not refresh quotas, keeping previous values");
                false
            }
        }
    }
}
