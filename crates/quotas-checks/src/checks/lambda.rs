//! Lambda account limits

use std::sync::Arc;

use async_trait::async_trait;
use quotas_common::{QuotaUsage, QuotasError, Result};
use tracing::instrument;

use super::UsageCheck;
use crate::provider::LambdaApi;

pub const LAMBDA_CONCURRENT_EXECUTIONS: &str = "lambda_concurrent_executions_limit";
const LAMBDA_CONCURRENT_EXECUTIONS_DESC: &str =
    "Measures the maximum number of concurrent executions allowed for an AWS Lambda function.";

pub const LAMBDA_CODE_SIZE_UNZIPPED: &str = "lambda_code_size_unzipped_limit_bytes";
const LAMBDA_CODE_SIZE_UNZIPPED_DESC: &str =
    "Measures the maximum size limit (in bytes) for the unzipped AWS Lambda function code.";

/// Concurrent executions and unzipped code size, both read from the
/// account settings in one call
pub struct LambdaAccountLimitsCheck {
    client: Arc<dyn LambdaApi>,
}

impl LambdaAccountLimitsCheck {
    pub fn new(client: Arc<dyn LambdaApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UsageCheck for LambdaAccountLimitsCheck {
    fn name(&self) -> &'static str {
        LAMBDA_CONCURRENT_EXECUTIONS
    }

    #[instrument(skip(self))]
    async fn usage(&self) -> Result<Vec<QuotaUsage>> {
        let settings = self
            .client
            .get_account_settings()
            .await
            .map_err(|e| QuotasError::usage(LAMBDA_CONCURRENT_EXECUTIONS, e))?;

        Ok(vec![
            QuotaUsage::new(
                LAMBDA_CONCURRENT_EXECUTIONS,
                LAMBDA_CONCURRENT_EXECUTIONS_DESC,
                settings.function_count as f64,
            )
            .with_quota(settings.concurrent_executions as f64),
            QuotaUsage::new(
                LAMBDA_CODE_SIZE_UNZIPPED,
                LAMBDA_CODE_SIZE_UNZIPPED_DESC,
                settings.total_code_size as f64,
            )
            .with_quota(settings.code_size_unzipped as f64),
        ])
    }
}
