//! Cloud provider client seam
//!
//! Each trait mirrors the slice of one AWS service API the usage checks
//! need. Implementations resolve pagination themselves and hand back the
//! complete, typed result set or a [`ProviderError`].

use async_trait::async_trait;
use quotas_common::{to_prometheus_naming_format, ProviderError, Tags};

/// Resource tag as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Convert provider tags into usage tags keyed by label name
pub fn normalize_tags(tags: &[Tag]) -> Tags {
    tags.iter()
        .map(|tag| (to_prometheus_naming_format(&tag.key), tag.value.clone()))
        .collect()
}

/// Describe filter (`Name` plus accepted `Values`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

impl Filter {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityGroup {
    pub group_id: String,
    pub ingress_rules: usize,
    pub egress_rules: usize,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkInterface {
    pub network_interface_id: String,
    pub security_groups: usize,
    pub tags: Vec<Tag>,
}

/// EC2 instance, reduced to what the vCPU checks read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instance {
    pub instance_id: String,
    /// `spot` or `scheduled`; unset for on-demand instances
    pub instance_lifecycle: Option<String>,
    pub core_count: Option<i32>,
    pub threads_per_core: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subnet {
    pub subnet_arn: String,
    pub cidr_block: String,
    pub available_ip_address_count: i64,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoScalingInstance {
    pub instance_id: String,
    pub lifecycle_state: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoScalingGroup {
    pub name: String,
    pub max_size: i64,
    pub instances: Vec<AutoScalingInstance>,
    pub tags: Vec<Tag>,
}

/// Lambda account limits and current usage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountSettings {
    pub concurrent_executions: i64,
    pub code_size_unzipped: i64,
    pub function_count: i64,
    pub total_code_size: i64,
}

/// A quota limit declared by the Service Quotas API
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceQuota {
    pub quota_code: String,
    pub value: f64,
}

impl ServiceQuota {
    pub fn new(quota_code: impl Into<String>, value: f64) -> Self {
        Self {
            quota_code: quota_code.into(),
            value,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ec2Api: Send + Sync {
    async fn describe_security_groups(&self) -> Result<Vec<SecurityGroup>, ProviderError>;

    async fn describe_network_interfaces(&self) -> Result<Vec<NetworkInterface>, ProviderError>;

    async fn describe_instances(&self, filters: Vec<Filter>)
        -> Result<Vec<Instance>, ProviderError>;

    async fn describe_subnets(&self) -> Result<Vec<Subnet>, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AutoScalingApi: Send + Sync {
    async fn describe_auto_scaling_groups(&self) -> Result<Vec<AutoScalingGroup>, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LambdaApi: Send + Sync {
    async fn get_account_settings(&self) -> Result<AccountSettings, ProviderError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceQuotasApi: Send + Sync {
    /// All quotas declared for `service_code`
    async fn list_service_quotas(
        &self,
        service_code: &str,
    ) -> Result<Vec<ServiceQuota>, ProviderError>;
}
