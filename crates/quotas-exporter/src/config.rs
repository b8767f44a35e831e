//! Exporter configuration

use std::collections::HashSet;
use std::time::Duration;

use quotas_common::labels::{is_valid_label_name, to_prometheus_naming_format};
use quotas_common::{Partition, QuotasError, Result, REGION_LABEL, RESOURCE_LABEL};
use serde::{Deserialize, Serialize};

/// Default listen port
pub const DEFAULT_PORT: u16 = 9090;

/// Default refresh period in seconds
pub const DEFAULT_REFRESH_PERIOD_SECS: u64 = 360;

/// Exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// HTTP listen port
    pub port: u16,
    /// Region to export quotas for
    pub region: String,
    /// Named credentials profile
    pub profile: Option<String>,
    /// Seconds between refreshes
    pub refresh_period_secs: u64,
    /// Tag keys projected as metric labels, as given
    pub include_aws_tags: Vec<String>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            region: String::new(),
            profile: None,
            refresh_period_secs: DEFAULT_REFRESH_PERIOD_SECS,
            include_aws_tags: Vec::new(),
        }
    }
}

impl ExporterConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from a variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = lookup("QUOTAS_PORT") {
            cfg.port = parse("QUOTAS_PORT", &port)?;
        }

        // QUOTAS_REGION takes priority over the SDK's AWS_REGION
        if let Some(region) = lookup("QUOTAS_REGION").or_else(|| lookup("AWS_REGION")) {
            cfg.region = region.trim().to_string();
        }

        cfg.profile = lookup("AWS_PROFILE").filter(|p| !p.trim().is_empty());

        if let Some(period) = lookup("QUOTAS_REFRESH_PERIOD_SECS") {
            cfg.refresh_period_secs = parse("QUOTAS_REFRESH_PERIOD_SECS", &period)?;
        }

        if let Some(tags) = lookup("QUOTAS_INCLUDE_AWS_TAGS") {
            cfg.include_aws_tags = tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(cfg)
    }

    /// Check the configuration and resolve the region's partition
    pub fn validate(&self) -> Result<Partition> {
        if self.region.is_empty() {
            return Err(QuotasError::config("region is required (AWS_REGION)"));
        }
        let partition = Partition::for_region(&self.region)?;

        if self.refresh_period_secs == 0 {
            return Err(QuotasError::config("refresh period must be at least one second"));
        }

        self.tag_labels()?;
        Ok(partition)
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_period_secs)
    }

    /// Label names for the configured tag keys, in configuration order.
    ///
    /// Fails if a normalized name is not a valid label name or collides
    /// with a reserved label or another tag.
    pub fn tag_labels(&self) -> Result<Vec<String>> {
        let mut seen: HashSet<String> =
            HashSet::from([RESOURCE_LABEL.to_string(), REGION_LABEL.to_string()]);

        self.include_aws_tags
            .iter()
            .map(|tag| {
                let label = to_prometheus_naming_format(tag);
                if !is_valid_label_name(&label) {
                    return Err(QuotasError::config(format!(
                        "tag {tag:?} does not map to a valid label name ({label:?})"
                    )));
                }
                if !seen.insert(label.clone()) {
                    return Err(QuotasError::config(format!(
                        "tag {tag:?} maps to label {label:?}, which is already in use"
                    )));
                }
                Ok(label)
            })
            .collect()
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| QuotasError::config(format!("invalid value for {key}: {value:?}")))
}
