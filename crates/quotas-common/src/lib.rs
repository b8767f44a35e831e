//! # Quotas Common
//!
//! Shared types, errors, and helpers for the AWS service quotas exporter.
//!
//! ## Core Types
//!
//! - [`QuotaUsage`]: a normalized usage record produced by a usage check
//! - [`CacheKey`]: the per-metric discriminator derived from a [`QuotaUsage`]
//! - [`QuotasError`]: the error kinds shared by every crate in the workspace
//!
//! ## Helpers
//!
//! - [`labels`]: tag key to metric label normalization
//! - [`partition`]: known AWS partitions and their regions

pub mod error;
pub mod labels;
pub mod partition;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ProviderError, QuotasError, Result};
pub use labels::to_prometheus_naming_format;
pub use partition::Partition;
pub use types::{
    cache_key::CacheKey,
    quota_usage::{QuotaUsage, Tags},
};

/// Exporter version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Namespace prepended to every exported quota metric
pub const METRIC_NAMESPACE: &str = "aws";

/// Variable label carrying the resource identifier
pub const RESOURCE_LABEL: &str = "resource";

/// Constant label carrying the configured region
pub const REGION_LABEL: &str = "region";
