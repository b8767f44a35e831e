//! # Quotas Exporter
//!
//! Republishes AWS service quotas and their usage as Prometheus gauges.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐  bootstrap   ┌─────────────┐  desc/collect  ┌──────────┐
//! │ QuotasSource   │─────────────►│ MetricCache │◄───────────────│ Registry │
//! │ (aggregator)   │─────────────►│             │                └──────────┘
//! └────────────────┘   refresh    └─────────────┘                     ▲
//!         ▲                              ▲                           │
//!         │                       RefreshScheduler             GET /metrics
//!   usage checks
//! ```
//!
//! ## Modules
//!
//! - [`cache`]: the metric cache and its prometheus collector
//! - [`scheduler`]: periodic refresh loop
//! - [`metrics`]: exporter self-metrics
//! - [`config`]: environment configuration
//! - [`server`]: `/metrics` and `/health`
//! - `aws`: SDK backed provider clients (`aws` feature)

#[cfg(feature = "aws")]
pub mod aws;
pub mod cache;
pub mod config;
pub mod metrics;
pub mod scheduler;
pub mod server;

pub use cache::{CacheCollector, CacheConfig, CacheState, MetricCache};
pub use config::ExporterConfig;
pub use metrics::ExporterMetrics;
pub use scheduler::RefreshScheduler;

/// Exporter version
pub const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");
