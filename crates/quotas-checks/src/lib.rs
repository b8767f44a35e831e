//! # Quotas Checks
//!
//! Usage checks and quota aggregation.
//!
//! ## Architecture
//!
//! ```text
//! Ec2Api / AutoScalingApi / LambdaApi        ServiceQuotasApi
//!              │                                    │
//!              ▼                                    │
//!        UsageCheck (one per quota) ───────► ServiceQuotas
//!                                                   │
//!                                                   ▼
//!                                         Vec<QuotaUsage>
//! ```
//!
//! The provider traits are the seam to the cloud SDK: they return fully
//! paginated, typed results. [`ServiceQuotas`] implements [`QuotasSource`],
//! which is all the metric cache depends on.

pub mod aggregator;
pub mod checks;
pub mod provider;

pub use aggregator::{QuotasSource, ServiceQuotas, UsageChecks, MONITORED_SERVICES};
pub use checks::UsageCheck;
pub use provider::{AutoScalingApi, Ec2Api, LambdaApi, ServiceQuotasApi};
