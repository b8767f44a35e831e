//! Integration Tests for the AWS Quotas Exporter
//!
//! Drives the full pipeline against an in-memory provider:
//! - provider clients → usage checks → aggregator
//! - aggregator → metric cache → prometheus registry
//! - registry → `/metrics` text exposition

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use parking_lot::Mutex;
use prometheus::Registry;
use tower::ServiceExt;

use quotas_checks::provider::{
    AccountSettings, AutoScalingApi, AutoScalingGroup, AutoScalingInstance, Ec2Api, Filter,
    Instance, LambdaApi, NetworkInterface, SecurityGroup, ServiceQuota, ServiceQuotasApi, Subnet,
    Tag,
};
use quotas_checks::{ServiceQuotas, UsageChecks};
use quotas_common::{ProviderError, QuotasError};
use quotas_exporter::{server, CacheCollector, CacheConfig, ExporterConfig, MetricCache};

type ProviderResult<T> = Result<T, ProviderError>;

/// In-memory AWS account
#[derive(Default)]
struct FakeAccount {
    security_groups: Vec<SecurityGroup>,
    network_interfaces: Vec<NetworkInterface>,
    instances: Vec<Instance>,
    subnets: Vec<Subnet>,
    auto_scaling_groups: Vec<AutoScalingGroup>,
    lambda: AccountSettings,
    quotas: Vec<(String, ServiceQuota)>,
    fail_subnets: bool,
}

#[derive(Clone, Default)]
struct FakeProvider {
    account: Arc<Mutex<FakeAccount>>,
}

impl FakeProvider {
    fn update(&self, f: impl FnOnce(&mut FakeAccount)) {
        f(&mut self.account.lock());
    }
}

#[async_trait]
impl Ec2Api for FakeProvider {
    async fn describe_security_groups(&self) -> ProviderResult<Vec<SecurityGroup>> {
        Ok(self.account.lock().security_groups.clone())
    }

    async fn describe_network_interfaces(&self) -> ProviderResult<Vec<NetworkInterface>> {
        Ok(self.account.lock().network_interfaces.clone())
    }

    async fn describe_instances(&self, filters: Vec<Filter>) -> ProviderResult<Vec<Instance>> {
        let spot_only = filters.iter().any(|f| f.name == "instance-lifecycle");
        Ok(self
            .account
            .lock()
            .instances
            .iter()
            .filter(|i| !spot_only || i.instance_lifecycle.as_deref() == Some("spot"))
            .cloned()
            .collect())
    }

    async fn describe_subnets(&self) -> ProviderResult<Vec<Subnet>> {
        let account = self.account.lock();
        if account.fail_subnets {
            return Err(ProviderError::new("DescribeSubnets", "throttled"));
        }
        Ok(account.subnets.clone())
    }
}

#[async_trait]
impl AutoScalingApi for FakeProvider {
    async fn describe_auto_scaling_groups(&self) -> ProviderResult<Vec<AutoScalingGroup>> {
        Ok(self.account.lock().auto_scaling_groups.clone())
    }
}

#[async_trait]
impl LambdaApi for FakeProvider {
    async fn get_account_settings(&self) -> ProviderResult<AccountSettings> {
        Ok(self.account.lock().lambda.clone())
    }
}

#[async_trait]
impl ServiceQuotasApi for FakeProvider {
    async fn list_service_quotas(&self, service_code: &str) -> ProviderResult<Vec<ServiceQuota>> {
        Ok(self
            .account
            .lock()
            .quotas
            .iter()
            .filter(|(service, _)| service == service_code)
            .map(|(_, quota)| quota.clone())
            .collect())
    }
}

fn seeded_account() -> FakeAccount {
    FakeAccount {
        security_groups: vec![
            SecurityGroup {
                group_id: "sg-1".to_string(),
                ingress_rules: 3,
                egress_rules: 1,
                tags: vec![Tag::new("CostCenter", "platform")],
            },
            SecurityGroup {
                group_id: "sg-2".to_string(),
                ingress_rules: 1,
                egress_rules: 1,
                tags: vec![],
            },
        ],
        network_interfaces: vec![NetworkInterface {
            network_interface_id: "eni-1".to_string(),
            security_groups: 2,
            tags: vec![],
        }],
        instances: vec![
            Instance {
                instance_id: "i-1".to_string(),
                instance_lifecycle: None,
                core_count: Some(2),
                threads_per_core: Some(2),
            },
            Instance {
                instance_id: "i-2".to_string(),
                instance_lifecycle: Some("spot".to_string()),
                core_count: Some(1),
                threads_per_core: Some(2),
            },
        ],
        subnets: vec![Subnet {
            subnet_arn: "arn:aws:ec2:eu-west-1:123456789012:subnet/subnet-1".to_string(),
            cidr_block: "10.0.0.0/24".to_string(),
            available_ip_address_count: 192,
            tags: vec![],
        }],
        auto_scaling_groups: vec![AutoScalingGroup {
            name: "asg-1".to_string(),
            max_size: 5,
            instances: vec![
                AutoScalingInstance {
                    instance_id: "i-1".to_string(),
                    lifecycle_state: "InService".to_string(),
                },
                AutoScalingInstance {
                    instance_id: "i-3".to_string(),
                    lifecycle_state: "Terminating".to_string(),
                },
            ],
            tags: vec![Tag::new("CostCenter", "batch")],
        }],
        lambda: AccountSettings {
            concurrent_executions: 1000,
            code_size_unzipped: 262_144_000,
            function_count: 12,
            total_code_size: 4096,
        },
        quotas: vec![
            ("ec2".to_string(), ServiceQuota::new("L-1216C47A", 32.0)),
            ("ec2".to_string(), ServiceQuota::new("L-34B43A08", 16.0)),
            ("vpc".to_string(), ServiceQuota::new("L-0EA8095F", 60.0)),
            ("vpc".to_string(), ServiceQuota::new("L-2AFB9258", 5.0)),
            ("vpc".to_string(), ServiceQuota::new("L-E79EC296", 2500.0)),
        ],
        fail_subnets: false,
    }
}

/// Test harness wiring the fake provider into a ready cache
struct TestHarness {
    provider: FakeProvider,
    cache: Arc<MetricCache>,
    registry: Registry,
}

impl TestHarness {
    async fn start(region: &str, tags: &str) -> Result<Self, QuotasError> {
        let provider = FakeProvider::default();
        provider.update(|account| *account = seeded_account());

        let config = ExporterConfig::from_lookup(|key| match key {
            "AWS_REGION" => Some(region.to_string()),
            "QUOTAS_INCLUDE_AWS_TAGS" => Some(tags.to_string()),
            _ => None,
        })?;
        config.validate()?;

        let quotas = ServiceQuotas::new(
            config.region.clone(),
            Arc::new(provider.clone()),
            UsageChecks::aws_default(
                Arc::new(provider.clone()),
                Arc::new(provider.clone()),
                Arc::new(provider.clone()),
            ),
        )?;

        let (cache, bootstrap) = MetricCache::start(
            CacheConfig::new(config.region.clone()).with_tag_labels(config.tag_labels()?),
            Arc::new(quotas),
        );
        bootstrap
            .await
            .map_err(|e| QuotasError::Internal(e.to_string()))??;

        let registry = Registry::new();
        registry.register(Box::new(CacheCollector::new(cache.clone())))?;

        Ok(Self {
            provider,
            cache,
            registry,
        })
    }

    async fn scrape(&self) -> String {
        let response = server::router(self.registry.clone())
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    /// Test: every check ends up in the exposition with its limit
    #[tokio::test]
    async fn test_full_scrape() {
        let harness = TestHarness::start("eu-west-1", "CostCenter").await.unwrap();

        let text = harness.scrape().await;

        assert!(text.contains("# TYPE aws_rules_per_security_group_used_total gauge"));
        assert!(text.contains(
            r#"aws_rules_per_security_group_used_total{cost_center="platform",region="eu-west-1",resource="sg-1"} 4"#
        ));
        assert!(text.contains(
            r#"aws_rules_per_security_group_limit_total{cost_center="",region="eu-west-1",resource="sg-2"} 60"#
        ));
        assert!(text.contains(
            r#"aws_ondemand_instance_requests_used_total{cost_center="",region="eu-west-1",resource="ondemand_instance_requests"} 4"#
        ));
        assert!(text.contains(
            r#"aws_spot_instance_requests_used_total{cost_center="",region="eu-west-1",resource="spot_instance_requests"} 2"#
        ));
        assert!(text.contains(
            r#"aws_instances_per_asg_used_total{cost_center="batch",region="eu-west-1",resource="asg-1"} 1"#
        ));
        assert!(text.contains(
            r#"aws_available_IPs_per_subnet_used_total{cost_center="",region="eu-west-1",resource="arn:aws:ec2:eu-west-1:123456789012:subnet/subnet-1|10.0.0.0/24"} 0.25"#
        ));
        assert!(text.contains(
            r#"aws_lambda_concurrent_executions_limit_limit_total{cost_center="",region="eu-west-1",resource="lambda_concurrent_executions_limit"} 1000"#
        ));
        assert!(
            text.contains("# HELP aws_instances_per_asg_limit_total Limit of instances per ASG")
        );
    }

    /// Test: refresh updates values, keeps stale entries, ignores new resources
    #[tokio::test]
    async fn test_refresh_cycle() {
        let harness = TestHarness::start("eu-west-1", "").await.unwrap();
        let entries = harness.cache.len();

        harness.provider.update(|account| {
            account.security_groups[0].ingress_rules = 10;
            account.security_groups.remove(1);
            account.security_groups.push(SecurityGroup {
                group_id: "sg-new".to_string(),
                ..Default::default()
            });
        });
        harness.cache.refresh().await.unwrap();

        let text = harness.scrape().await;
        assert_eq!(harness.cache.len(), entries);
        assert!(text.contains(
            r#"aws_rules_per_security_group_used_total{region="eu-west-1",resource="sg-1"} 11"#
        ));
        assert!(text.contains(
            r#"aws_rules_per_security_group_used_total{region="eu-west-1",resource="sg-2"} 2"#
        ));
        assert!(!text.contains("sg-new"));
    }

    /// Test: tag changes reach the exported label values on refresh
    #[tokio::test]
    async fn test_refresh_updates_tag_labels() {
        let harness = TestHarness::start("eu-west-1", "CostCenter").await.unwrap();

        harness.provider.update(|account| {
            account.security_groups[0].tags = vec![Tag::new("CostCenter", "finance")];
            account.auto_scaling_groups[0].tags.clear();
        });
        harness.cache.refresh().await.unwrap();

        let text = harness.scrape().await;
        assert!(text.contains(
            r#"aws_rules_per_security_group_used_total{cost_center="finance",region="eu-west-1",resource="sg-1"} 4"#
        ));
        assert!(text.contains(
            r#"aws_instances_per_asg_used_total{cost_center="",region="eu-west-1",resource="asg-1"} 1"#
        ));
        assert!(!text.contains("platform"));
        assert!(!text.contains(r#"cost_center="batch""#));
    }

    /// Test: a failing refresh keeps the previous snapshot
    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let harness = TestHarness::start("eu-west-1", "").await.unwrap();
        let before = harness.scrape().await;

        harness.provider.update(|account| {
            account.fail_subnets = true;
            account.security_groups[0].ingress_rules = 50;
        });
        let err = harness.cache.refresh().await.unwrap_err();

        assert!(matches!(err, QuotasError::FailedToGetUsage { .. }));
        assert_eq!(harness.scrape().await, before);
    }

    /// Test: China regions only export standalone checks
    #[tokio::test]
    async fn test_restricted_partition() {
        let harness = TestHarness::start("cn-north-1", "").await.unwrap();

        let text = harness.scrape().await;

        assert!(text.contains("aws_instances_per_asg_used_total"));
        assert!(text.contains("aws_available_IPs_per_subnet_used_total"));
        assert!(!text.contains("aws_rules_per_security_group_used_total"));
        assert!(!text.contains("aws_spot_instance_requests_used_total"));
    }
}

#[cfg(test)]
mod bootstrap_failure_tests {
    use super::*;

    /// Test: construction rejects unknown regions
    #[tokio::test]
    async fn test_invalid_region() {
        let result = TestHarness::start("asdasd", "").await;
        assert!(matches!(result, Err(QuotasError::InvalidRegion(_))));
    }

    /// Test: bootstrap errors surface from the bootstrap task
    #[tokio::test]
    async fn test_bootstrap_failure_is_fatal() {
        let provider = FakeProvider::default();
        provider.update(|account| {
            *account = seeded_account();
            account.fail_subnets = true;
        });
        let quotas = ServiceQuotas::new(
            "us-east-1",
            Arc::new(provider.clone()),
            UsageChecks::aws_default(
                Arc::new(provider.clone()),
                Arc::new(provider.clone()),
                Arc::new(provider.clone()),
            ),
        )
        .unwrap();

        let (cache, bootstrap) =
            MetricCache::start(CacheConfig::new("us-east-1"), Arc::new(quotas));
        let result = bootstrap.await.unwrap();

        assert!(matches!(result, Err(QuotasError::FailedToGetUsage { .. })));
        assert!(!cache.is_ready());
        assert!(cache.is_empty());
    }
}
