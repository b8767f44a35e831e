//! Available IPv4 addresses per subnet

use std::sync::Arc;

use async_trait::async_trait;
use quotas_common::{QuotaUsage, QuotasError, Result};
use tracing::instrument;

use super::UsageCheck;
use crate::provider::{normalize_tags, Ec2Api, Subnet};

pub const AVAILABLE_IPS_PER_SUBNET: &str = "available_IPs_per_subnet";
const AVAILABLE_IPS_PER_SUBNET_DESC: &str = "available IPs per subnet";

/// Fraction of each subnet's address space in use.
///
/// Carries its own quota (the subnet size), so it runs as a standalone
/// check rather than against a Service Quotas code.
pub struct AvailableIpsPerSubnetCheck {
    client: Arc<dyn Ec2Api>,
}

impl AvailableIpsPerSubnetCheck {
    pub fn new(client: Arc<dyn Ec2Api>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UsageCheck for AvailableIpsPerSubnetCheck {
    fn name(&self) -> &'static str {
        AVAILABLE_IPS_PER_SUBNET
    }

    #[instrument(skip(self))]
    async fn usage(&self) -> Result<Vec<QuotaUsage>> {
        let subnets = self
            .client
            .describe_subnets()
            .await
            .map_err(|e| QuotasError::usage(AVAILABLE_IPS_PER_SUBNET, e))?;

        subnets.iter().map(subnet_usage).collect()
    }
}

fn subnet_usage(subnet: &Subnet) -> Result<QuotaUsage> {
    let max_addresses = cidr_size(&subnet.cidr_block)?;
    let usage = (max_addresses - subnet.available_ip_address_count as f64) / max_addresses;

    Ok(
        QuotaUsage::new(AVAILABLE_IPS_PER_SUBNET, AVAILABLE_IPS_PER_SUBNET_DESC, usage)
            .with_resource(format!("{}|{}", subnet.subnet_arn, subnet.cidr_block))
            .with_quota(max_addresses)
            .with_tags(normalize_tags(&subnet.tags)),
    )
}

/// Number of addresses in an IPv4 CIDR block: `2^(32 - mask)`
pub fn cidr_size(cidr_block: &str) -> Result<f64> {
    let mask: u32 = cidr_block
        .rsplit_once('/')
        .and_then(|(_, mask)| mask.parse().ok())
        .filter(|mask| *mask <= 32)
        .ok_or_else(|| QuotasError::FailedToConvertCidr(cidr_block.to_string()))?;

    Ok(2f64.powi((32 - mask) as i32))
}
