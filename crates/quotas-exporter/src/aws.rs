//! AWS SDK backed provider clients
//!
//! Adapts the SDK clients to the provider traits the usage checks depend
//! on. Pagination is resolved here; callers always get complete results.

use std::sync::Arc;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use quotas_checks::provider::{
    AccountSettings, AutoScalingApi, AutoScalingGroup, AutoScalingInstance, Ec2Api, Filter,
    Instance, LambdaApi, NetworkInterface, SecurityGroup, ServiceQuota, ServiceQuotasApi, Subnet,
    Tag,
};
use quotas_checks::{ServiceQuotas, UsageChecks};
use quotas_common::{ProviderError, Result};
use tracing::{debug, info};

/// Load the shared SDK configuration for `region` and an optional profile
pub async fn load_sdk_config(region: &str, profile: Option<&str>) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    info!(region, profile = profile.unwrap_or("default"), "Loading AWS configuration");
    loader.load().await
}

/// Build the quota aggregator with every known usage check
pub fn service_quotas(config: &SdkConfig, region: &str) -> Result<ServiceQuotas> {
    let ec2: Arc<dyn Ec2Api> = Arc::new(AwsEc2::new(config));
    let autoscaling: Arc<dyn AutoScalingApi> = Arc::new(AwsAutoScaling::new(config));
    let lambda: Arc<dyn LambdaApi> = Arc::new(AwsLambda::new(config));

    ServiceQuotas::new(
        region,
        Arc::new(AwsServiceQuotas::new(config)),
        UsageChecks::aws_default(ec2, autoscaling, lambda),
    )
}

fn provider_error(operation: &str, err: impl std::error::Error) -> ProviderError {
    ProviderError::new(operation, error_chain(&err))
}

/// Render an error and all of its sources on one line
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

fn ec2_tags(tags: &[aws_sdk_ec2::types::Tag]) -> Vec<Tag> {
    tags.iter()
        .map(|t| Tag::new(text(t.key()), text(t.value())))
        .collect()
}

pub struct AwsEc2 {
    client: aws_sdk_ec2::Client,
}

impl AwsEc2 {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ec2::Client::new(config),
        }
    }
}

#[async_trait]
impl Ec2Api for AwsEc2 {
    async fn describe_security_groups(
        &self,
    ) -> std::result::Result<Vec<SecurityGroup>, ProviderError> {
        let mut groups = Vec::new();
        let mut pages = self.client.describe_security_groups().into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| provider_error("DescribeSecurityGroups", e))?;
            groups.extend(page.security_groups().iter().map(|g| SecurityGroup {
                group_id: text(g.group_id()),
                ingress_rules: g.ip_permissions().len(),
                egress_rules: g.ip_permissions_egress().len(),
                tags: ec2_tags(g.tags()),
            }));
        }
        debug!(count = groups.len(), "Described security groups");
        Ok(groups)
    }

    async fn describe_network_interfaces(
        &self,
    ) -> std::result::Result<Vec<NetworkInterface>, ProviderError> {
        let mut interfaces = Vec::new();
        let mut pages = self.client.describe_network_interfaces().into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| provider_error("DescribeNetworkInterfaces", e))?;
            interfaces.extend(page.network_interfaces().iter().map(|eni| NetworkInterface {
                network_interface_id: text(eni.network_interface_id()),
                security_groups: eni.groups().len(),
                tags: ec2_tags(eni.tag_set()),
            }));
        }
        debug!(count = interfaces.len(), "Described network interfaces");
        Ok(interfaces)
    }

    async fn describe_instances(
        &self,
        filters: Vec<Filter>,
    ) -> std::result::Result<Vec<Instance>, ProviderError> {
        let filters = filters
            .into_iter()
            .map(|f| {
                aws_sdk_ec2::types::Filter::builder()
                    .name(f.name)
                    .set_values(Some(f.values))
                    .build()
            })
            .collect();

        let mut instances = Vec::new();
        let mut pages = self
            .client
            .describe_instances()
            .set_filters(Some(filters))
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| provider_error("DescribeInstances", e))?;
            for reservation in page.reservations() {
                instances.extend(reservation.instances().iter().map(|i| Instance {
                    instance_id: text(i.instance_id()),
                    instance_lifecycle: i.instance_lifecycle().map(|l| l.as_str().to_string()),
                    core_count: i.cpu_options().and_then(|c| c.core_count()),
                    threads_per_core: i.cpu_options().and_then(|c| c.threads_per_core()),
                }));
            }
        }
        debug!(count = instances.len(), "Described instances");
        Ok(instances)
    }

    async fn describe_subnets(&self) -> std::result::Result<Vec<Subnet>, ProviderError> {
        let mut subnets = Vec::new();
        let mut pages = self.client.describe_subnets().into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| provider_error("DescribeSubnets", e))?;
            subnets.extend(page.subnets().iter().map(|s| Subnet {
                subnet_arn: text(s.subnet_arn()),
                cidr_block: text(s.cidr_block()),
                available_ip_address_count: i64::from(
                    s.available_ip_address_count().unwrap_or_default(),
                ),
                tags: ec2_tags(s.tags()),
            }));
        }
        debug!(count = subnets.len(), "Described subnets");
        Ok(subnets)
    }
}

pub struct AwsAutoScaling {
    client: aws_sdk_autoscaling::Client,
}

impl AwsAutoScaling {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_autoscaling::Client::new(config),
        }
    }
}

#[async_trait]
impl AutoScalingApi for AwsAutoScaling {
    async fn describe_auto_scaling_groups(
        &self,
    ) -> std::result::Result<Vec<AutoScalingGroup>, ProviderError> {
        let mut groups = Vec::new();
        let mut pages = self
            .client
            .describe_auto_scaling_groups()
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| provider_error("DescribeAutoScalingGroups", e))?;
            groups.extend(page.auto_scaling_groups().iter().map(|asg| AutoScalingGroup {
                name: text(asg.auto_scaling_group_name()),
                max_size: i64::from(asg.max_size().unwrap_or_default()),
                instances: asg
                    .instances()
                    .iter()
                    .map(|i| AutoScalingInstance {
                        instance_id: text(i.instance_id()),
                        lifecycle_state: i
                            .lifecycle_state()
                            .map(|s| s.as_str().to_string())
                            .unwrap_or_default(),
                    })
                    .collect(),
                tags: asg
                    .tags()
                    .iter()
                    .map(|t| Tag::new(text(t.key()), text(t.value())))
                    .collect(),
            }));
        }
        debug!(count = groups.len(), "Described auto scaling groups");
        Ok(groups)
    }
}

pub struct AwsLambda {
    client: aws_sdk_lambda::Client,
}

impl AwsLambda {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_lambda::Client::new(config),
        }
    }
}

#[async_trait]
impl LambdaApi for AwsLambda {
    async fn get_account_settings(&self) -> std::result::Result<AccountSettings, ProviderError> {
        let output = self
            .client
            .get_account_settings()
            .send()
            .await
            .map_err(|e| provider_error("GetAccountSettings", e))?;

        let limit = output
            .account_limit()
            .ok_or_else(|| ProviderError::new("GetAccountSettings", "missing account limit"))?;
        let usage = output
            .account_usage()
            .ok_or_else(|| ProviderError::new("GetAccountSettings", "missing account usage"))?;

        Ok(AccountSettings {
            concurrent_executions: i64::from(limit.concurrent_executions()),
            code_size_unzipped: limit.code_size_unzipped(),
            function_count: usage.function_count(),
            total_code_size: usage.total_code_size(),
        })
    }
}

pub struct AwsServiceQuotas {
    client: aws_sdk_servicequotas::Client,
}

impl AwsServiceQuotas {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_servicequotas::Client::new(config),
        }
    }
}

#[async_trait]
impl ServiceQuotasApi for AwsServiceQuotas {
    async fn list_service_quotas(
        &self,
        service_code: &str,
    ) -> std::result::Result<Vec<ServiceQuota>, ProviderError> {
        let mut quotas = Vec::new();
        let mut pages = self
            .client
            .list_service_quotas()
            .service_code(service_code)
            .into_paginator()
            .send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| provider_error("ListServiceQuotas", e))?;
            quotas.extend(page.quotas().iter().filter_map(|q| {
                Some(ServiceQuota::new(q.quota_code()?, q.value()?))
            }));
        }
        debug!(service_code, count = quotas.len(), "Listed service quotas");
        Ok(quotas)
    }
}
