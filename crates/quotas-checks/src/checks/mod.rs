//! Usage checks
//!
//! A usage check owns exactly one quota or category and turns raw provider
//! data into [`QuotaUsage`] records:
//! - per-resource checks return one record per resource, keyed by the
//!   resource's provider identifier
//! - region scoped checks return a single record without a resource name
//!
//! Checks hold no state between calls; every call goes to the provider.

pub mod autoscaling;
pub mod ec2;
pub mod lambda;
pub mod subnet;

use async_trait::async_trait;
use quotas_common::{QuotaUsage, Result};

pub use autoscaling::InstancesPerAsgCheck;
pub use ec2::{
    OnDemandInstanceRequestsCheck, RulesPerSecurityGroupCheck, SecurityGroupsPerEniCheck,
    SecurityGroupsPerRegionCheck, SpotInstanceRequestsCheck,
};
pub use lambda::LambdaAccountLimitsCheck;
pub use subnet::AvailableIpsPerSubnetCheck;

/// Computes usage for one quota or category
#[async_trait]
pub trait UsageCheck: Send + Sync {
    /// Name of the quota or category this check reports
    fn name(&self) -> &'static str;

    /// Current usage records
    async fn usage(&self) -> Result<Vec<QuotaUsage>>;
}
