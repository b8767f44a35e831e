//! EC2 and VPC usage checks
//!
//! Not all of these quotas are listed under the `ec2` service code, but all
//! of them read their usage from the EC2 API.

use std::sync::Arc;

use async_trait::async_trait;
use quotas_common::{ProviderError, QuotaUsage, QuotasError, Result};
use tracing::{debug, instrument};

use super::UsageCheck;
use crate::provider::{normalize_tags, Ec2Api, Filter};

pub const RULES_PER_SECURITY_GROUP: &str = "rules_per_security_group";
const RULES_PER_SECURITY_GROUP_DESC: &str = "rules per security group";

pub const SECURITY_GROUPS_PER_ENI: &str = "security_groups_per_network_interface";
const SECURITY_GROUPS_PER_ENI_DESC: &str = "security groups per network interface";

pub const SECURITY_GROUPS_PER_REGION: &str = "security_groups_per_region";
const SECURITY_GROUPS_PER_REGION_DESC: &str = "security groups per region";

pub const SPOT_INSTANCE_REQUESTS: &str = "spot_instance_requests";
const SPOT_INSTANCE_REQUESTS_DESC: &str = "spot instance requests";

pub const ONDEMAND_INSTANCE_REQUESTS: &str = "ondemand_instance_requests";
const ONDEMAND_INSTANCE_REQUESTS_DESC: &str = "ondemand instance requests";

/// Instance type families counted against the standard vCPU quotas
pub const STANDARD_INSTANCE_FAMILIES: [&str; 9] =
    ["a*", "c*", "d*", "h*", "i*", "m*", "r*", "t*", "z*"];

/// Inbound plus outbound rules, per security group
pub struct RulesPerSecurityGroupCheck {
    client: Arc<dyn Ec2Api>,
}

impl RulesPerSecurityGroupCheck {
    pub fn new(client: Arc<dyn Ec2Api>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UsageCheck for RulesPerSecurityGroupCheck {
    fn name(&self) -> &'static str {
        RULES_PER_SECURITY_GROUP
    }

    #[instrument(skip(self))]
    async fn usage(&self) -> Result<Vec<QuotaUsage>> {
        let groups = self
            .client
            .describe_security_groups()
            .await
            .map_err(|e| QuotasError::usage(RULES_PER_SECURITY_GROUP, e))?;

        Ok(groups
            .iter()
            .map(|group| {
                QuotaUsage::new(
                    RULES_PER_SECURITY_GROUP,
                    RULES_PER_SECURITY_GROUP_DESC,
                    (group.ingress_rules + group.egress_rules) as f64,
                )
                .with_resource(group.group_id.clone())
                .with_tags(normalize_tags(&group.tags))
            })
            .collect())
    }
}

/// Security groups attached to each network interface
pub struct SecurityGroupsPerEniCheck {
    client: Arc<dyn Ec2Api>,
}

impl SecurityGroupsPerEniCheck {
    pub fn new(client: Arc<dyn Ec2Api>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UsageCheck for SecurityGroupsPerEniCheck {
    fn name(&self) -> &'static str {
        SECURITY_GROUPS_PER_ENI
    }

    #[instrument(skip(self))]
    async fn usage(&self) -> Result<Vec<QuotaUsage>> {
        let interfaces = self
            .client
            .describe_network_interfaces()
            .await
            .map_err(|e| QuotasError::usage(SECURITY_GROUPS_PER_ENI, e))?;

        Ok(interfaces
            .iter()
            .map(|eni| {
                QuotaUsage::new(
                    SECURITY_GROUPS_PER_ENI,
                    SECURITY_GROUPS_PER_ENI_DESC,
                    eni.security_groups as f64,
                )
                .with_resource(eni.network_interface_id.clone())
                .with_tags(normalize_tags(&eni.tags))
            })
            .collect())
    }
}

/// Number of security groups in the region
pub struct SecurityGroupsPerRegionCheck {
    client: Arc<dyn Ec2Api>,
}

impl SecurityGroupsPerRegionCheck {
    pub fn new(client: Arc<dyn Ec2Api>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UsageCheck for SecurityGroupsPerRegionCheck {
    fn name(&self) -> &'static str {
        SECURITY_GROUPS_PER_REGION
    }

    #[instrument(skip(self))]
    async fn usage(&self) -> Result<Vec<QuotaUsage>> {
        let groups = self
            .client
            .describe_security_groups()
            .await
            .map_err(|e| QuotasError::usage(SECURITY_GROUPS_PER_REGION, e))?;

        Ok(vec![QuotaUsage::new(
            SECURITY_GROUPS_PER_REGION,
            SECURITY_GROUPS_PER_REGION_DESC,
            groups.len() as f64,
        )])
    }
}

/// vCPUs of pending or running standard spot instances
pub struct SpotInstanceRequestsCheck {
    client: Arc<dyn Ec2Api>,
}

impl SpotInstanceRequestsCheck {
    pub fn new(client: Arc<dyn Ec2Api>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UsageCheck for SpotInstanceRequestsCheck {
    fn name(&self) -> &'static str {
        SPOT_INSTANCE_REQUESTS
    }

    #[instrument(skip(self))]
    async fn usage(&self) -> Result<Vec<QuotaUsage>> {
        let vcpus = standard_instance_vcpus(self.client.as_ref(), true)
            .await
            .map_err(|e| QuotasError::usage(SPOT_INSTANCE_REQUESTS, e))?;

        Ok(vec![QuotaUsage::new(
            SPOT_INSTANCE_REQUESTS,
            SPOT_INSTANCE_REQUESTS_DESC,
            vcpus as f64,
        )])
    }
}

/// vCPUs of pending or running standard on-demand instances
pub struct OnDemandInstanceRequestsCheck {
    client: Arc<dyn Ec2Api>,
}

impl OnDemandInstanceRequestsCheck {
    pub fn new(client: Arc<dyn Ec2Api>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UsageCheck for OnDemandInstanceRequestsCheck {
    fn name(&self) -> &'static str {
        ONDEMAND_INSTANCE_REQUESTS
    }

    #[instrument(skip(self))]
    async fn usage(&self) -> Result<Vec<QuotaUsage>> {
        let vcpus = standard_instance_vcpus(self.client.as_ref(), false)
            .await
            .map_err(|e| QuotasError::usage(ONDEMAND_INSTANCE_REQUESTS, e))?;

        Ok(vec![QuotaUsage::new(
            ONDEMAND_INSTANCE_REQUESTS,
            ONDEMAND_INSTANCE_REQUESTS_DESC,
            vcpus as f64,
        )])
    }
}

/// Filters selecting active standard-family instances
pub fn standard_instance_filters(spot: bool) -> Vec<Filter> {
    let mut filters = vec![
        Filter::new("instance-type", STANDARD_INSTANCE_FAMILIES),
        Filter::new("instance-state-name", ["pending", "running"]),
    ];
    // Scheduled instances can't be filtered server side, so only spot
    // gets a lifecycle filter and on-demand is filtered client side.
    if spot {
        filters.push(Filter::new("instance-lifecycle", ["spot"]));
    }
    filters
}

/// Sum of `core_count * threads_per_core` over active standard instances.
///
/// Instances can launch with custom CPU options, so vCPUs are computed per
/// instance rather than looked up by instance type.
async fn standard_instance_vcpus(
    client: &dyn Ec2Api,
    spot: bool,
) -> std::result::Result<i64, ProviderError> {
    let instances = client
        .describe_instances(standard_instance_filters(spot))
        .await?;

    let vcpus: i64 = instances
        .iter()
        // a lifecycle marker means spot or scheduled, never on-demand
        .filter(|instance| spot || instance.instance_lifecycle.is_none())
        .filter_map(|instance| match (instance.core_count, instance.threads_per_core) {
            (Some(cores), Some(threads)) => Some(i64::from(cores) * i64::from(threads)),
            _ => None,
        })
        .sum();

    debug!(spot, instances = instances.len(), vcpus, "Counted standard vCPUs");
    Ok(vcpus)
}
