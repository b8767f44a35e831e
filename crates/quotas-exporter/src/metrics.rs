//! Exporter self-metrics

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use quotas_common::Result;

/// Prometheus metrics describing the exporter itself
#[derive(Clone)]
pub struct ExporterMetrics {
    pub refresh_total: IntCounter,
    pub refresh_errors_total: IntCounter,
    pub refresh_duration_seconds: Histogram,
    pub cached_metrics: IntGauge,
}

impl ExporterMetrics {
    pub fn new() -> Result<Self> {
        Ok(Self {
            refresh_total: IntCounter::new(
                "aws_quotas_exporter_refresh_total",
                "Total refresh cycles run",
            )?,
            refresh_errors_total: IntCounter::new(
                "aws_quotas_exporter_refresh_errors_total",
                "Total refresh cycles that failed",
            )?,
            refresh_duration_seconds: Histogram::with_opts(
                HistogramOpts::new(
                    "aws_quotas_exporter_refresh_duration_seconds",
                    "Duration of refresh cycles",
                )
                .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
            )?,
            cached_metrics: IntGauge::new(
                "aws_quotas_exporter_cached_metrics",
                "Number of quota metrics held in the cache",
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.refresh_total.clone()))?;
        registry.register(Box::new(self.refresh_errors_total.clone()))?;
        registry.register(Box::new(self.refresh_duration_seconds.clone()))?;
        registry.register(Box::new(self.cached_metrics.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register() {
        let registry = Registry::new();
        let metrics = ExporterMetrics::new().unwrap();
        metrics.register(&registry).unwrap();

        metrics.refresh_total.inc();
        metrics.cached_metrics.set(3);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"aws_quotas_exporter_refresh_total".to_string()));
        assert!(names.contains(&"aws_quotas_exporter_cached_metrics".to_string()));
    }

    #[test]
    fn test_double_register_fails() {
        let registry = Registry::new();
        let metrics = ExporterMetrics::new().unwrap();
        metrics.register(&registry).unwrap();
        assert!(metrics.register(&registry).is_err());
    }
}
