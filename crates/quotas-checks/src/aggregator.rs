//! Quota aggregation
//!
//! Resolves the limits declared by the Service Quotas API against the
//! registered usage checks:
//! 1. list the declared quotas of every monitored service, in order
//! 2. run the check registered for each listed quota code and stamp the
//!    declared limit on its records
//! 3. run the standalone checks, in registration order
//!
//! Aggregation is fail-fast: the first error aborts the run and no partial
//! result is returned.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use quotas_common::{Partition, QuotaUsage, QuotasError, Result};
use tracing::{debug, info, instrument};

use crate::checks::{
    AvailableIpsPerSubnetCheck, InstancesPerAsgCheck, LambdaAccountLimitsCheck,
    OnDemandInstanceRequestsCheck, RulesPerSecurityGroupCheck, SecurityGroupsPerEniCheck,
    SecurityGroupsPerRegionCheck, SpotInstanceRequestsCheck, UsageCheck,
};
use crate::provider::{AutoScalingApi, Ec2Api, LambdaApi, ServiceQuotasApi};

/// Service codes whose declared quotas are resolved, in processing order
pub const MONITORED_SERVICES: [&str; 2] = ["ec2", "vpc"];

/// Source of the flat list of usage records
#[async_trait]
pub trait QuotasSource: Send + Sync {
    async fn quotas_and_usage(&self) -> Result<Vec<QuotaUsage>>;
}

/// Registered usage checks
#[derive(Default)]
pub struct UsageChecks {
    by_quota_code: HashMap<String, Box<dyn UsageCheck>>,
    standalone: Vec<Box<dyn UsageCheck>>,
}

impl UsageChecks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The checks for every quota the exporter knows about
    pub fn aws_default(
        ec2: Arc<dyn Ec2Api>,
        autoscaling: Arc<dyn AutoScalingApi>,
        lambda: Arc<dyn LambdaApi>,
    ) -> Self {
        Self::new()
            .with_quota_check("L-0EA8095F", RulesPerSecurityGroupCheck::new(ec2.clone()))
            .with_quota_check("L-2AFB9258", SecurityGroupsPerEniCheck::new(ec2.clone()))
            .with_quota_check("L-E79EC296", SecurityGroupsPerRegionCheck::new(ec2.clone()))
            .with_quota_check("L-34B43A08", SpotInstanceRequestsCheck::new(ec2.clone()))
            .with_quota_check("L-1216C47A", OnDemandInstanceRequestsCheck::new(ec2.clone()))
            .with_standalone(AvailableIpsPerSubnetCheck::new(ec2))
            .with_standalone(InstancesPerAsgCheck::new(autoscaling))
            .with_standalone(LambdaAccountLimitsCheck::new(lambda))
    }

    /// Register a check whose limit comes from the quota with `code`
    pub fn with_quota_check(
        mut self,
        code: impl Into<String>,
        check: impl UsageCheck + 'static,
    ) -> Self {
        self.by_quota_code.insert(code.into(), Box::new(check));
        self
    }

    /// Register a check that reports its own limit
    pub fn with_standalone(mut self, check: impl UsageCheck + 'static) -> Self {
        self.standalone.push(Box::new(check));
        self
    }

    pub fn len(&self) -> usize {
        self.by_quota_code.len() + self.standalone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Service quotas and usage for one region
pub struct ServiceQuotas {
    region: String,
    partition: Partition,
    quotas_api: Arc<dyn ServiceQuotasApi>,
    checks: UsageChecks,
}

impl ServiceQuotas {
    /// Create an aggregator for `region`.
    ///
    /// Fails with [`QuotasError::InvalidRegion`] if the region belongs to no
    /// known partition.
    pub fn new(
        region: impl Into<String>,
        quotas_api: Arc<dyn ServiceQuotasApi>,
        checks: UsageChecks,
    ) -> Result<Self> {
        let region = region.into();
        let partition = Partition::for_region(&region)?;

        info!(
            region = %region,
            partition = %partition,
            checks = checks.len(),
            "Created service quotas aggregator"
        );

        Ok(Self {
            region,
            partition,
            quotas_api,
            checks,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    async fn quotas_for_service(&self, service: &str) -> Result<Vec<QuotaUsage>> {
        let quotas = self
            .quotas_api
            .list_service_quotas(service)
            .await
            .map_err(|e| QuotasError::list_quotas(service, e))?;

        let mut usages = Vec::new();
        for quota in &quotas {
            let Some(check) = self.checks.by_quota_code.get(&quota.quota_code) else {
                continue;
            };

            let records = check.usage().await?;
            debug!(
                service,
                code = %quota.quota_code,
                check = check.name(),
                records = records.len(),
                "Resolved quota"
            );
            usages.extend(records.into_iter().map(|mut usage| {
                usage.quota = quota.value;
                usage
            }));
        }

        Ok(usages)
    }
}

#[async_trait]
impl QuotasSource for ServiceQuotas {
    #[instrument(skip(self), fields(region = %self.region))]
    async fn quotas_and_usage(&self) -> Result<Vec<QuotaUsage>> {
        let mut all = Vec::new();

        if self.partition.is_restricted() {
            debug!(
                partition = %self.partition,
                "Service Quotas unavailable, skipping quota listing"
            );
        } else {
            for service in MONITORED_SERVICES {
                all.extend(self.quotas_for_service(service).await?);
            }
        }

        for check in &self.checks.standalone {
            all.extend(check.usage().await?);
        }

        debug!(records = all.len(), "Aggregated quotas and usage");
        Ok(all)
    }
}
