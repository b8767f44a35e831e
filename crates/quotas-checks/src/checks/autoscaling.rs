//! Instances per auto scaling group

use std::sync::Arc;

use async_trait::async_trait;
use quotas_common::{QuotaUsage, QuotasError, Result};
use tracing::instrument;

use super::UsageCheck;
use crate::provider::{normalize_tags, AutoScalingApi, AutoScalingInstance};

pub const INSTANCES_PER_ASG: &str = "instances_per_asg";
const INSTANCES_PER_ASG_DESC: &str = "instances per ASG";

/// Lifecycle states not counted as running
const NOT_RUNNING_STATES: [&str; 6] = [
    "Terminating",
    "Terminating:Wait",
    "Terminating:Proceed",
    "Terminated",
    "Detaching",
    "Detached",
];

/// Running instances against the group's max size, per auto scaling group
pub struct InstancesPerAsgCheck {
    client: Arc<dyn AutoScalingApi>,
}

impl InstancesPerAsgCheck {
    pub fn new(client: Arc<dyn AutoScalingApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UsageCheck for InstancesPerAsgCheck {
    fn name(&self) -> &'static str {
        INSTANCES_PER_ASG
    }

    #[instrument(skip(self))]
    async fn usage(&self) -> Result<Vec<QuotaUsage>> {
        let groups = self
            .client
            .describe_auto_scaling_groups()
            .await
            .map_err(|e| QuotasError::usage(INSTANCES_PER_ASG, e))?;

        Ok(groups
            .iter()
            .map(|asg| {
                let running = asg.instances.iter().filter(|i| is_running(i)).count();
                QuotaUsage::new(INSTANCES_PER_ASG, INSTANCES_PER_ASG_DESC, running as f64)
                    .with_resource(asg.name.clone())
                    .with_quota(asg.max_size as f64)
                    .with_tags(normalize_tags(&asg.tags))
            })
            .collect())
    }
}

fn is_running(instance: &AutoScalingInstance) -> bool {
    !NOT_RUNNING_STATES.contains(&instance.lifecycle_state.as_str())
}
