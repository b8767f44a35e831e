//! QuotaUsage - a normalized usage record
//!
//! Every usage check produces a flat list of these. A record is either:
//! - per-resource: `resource_name` carries the provider identifier
//!   (group id, ENI id, subnet ARN, ASG name)
//! - region scoped: `resource_name` is unset and `name` doubles as the
//!   resource label value

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Normalized tag key to raw tag value
pub type Tags = HashMap<String, String>;

/// Usage of a single quota, optionally for a single resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaUsage {
    /// Quota or category name, used in the metric family name
    pub name: String,

    /// Provider identifier of the resource the usage applies to
    pub resource_name: Option<String>,

    /// Human readable description, used in the metric help text
    pub description: String,

    /// Current consumption
    pub usage: f64,

    /// Current limit
    pub quota: f64,

    /// Resource tags keyed by normalized label name
    #[serde(default)]
    pub tags: Tags,
}

impl QuotaUsage {
    /// Create a region scoped usage record
    pub fn new(name: impl Into<String>, description: impl Into<String>, usage: f64) -> Self {
        Self {
            name: name.into(),
            resource_name: None,
            description: description.into(),
            usage,
            quota: 0.0,
            tags: Tags::new(),
        }
    }

    /// Set the resource this usage applies to
    pub fn with_resource(mut self, resource_name: impl Into<String>) -> Self {
        self.resource_name = Some(resource_name.into());
        self
    }

    /// Set the limit
    pub fn with_quota(mut self, quota: f64) -> Self {
        self.quota = quota;
        self
    }

    /// Set the resource tags
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Per-resource discriminator: the resource name if present, else the quota name
    pub fn identifier(&self) -> &str {
        self.resource_name.as_deref().unwrap_or(&self.name)
    }

    /// Label values matching `["resource"] + tag_labels` positionally.
    ///
    /// Tags missing on this resource yield an empty string so the value count
    /// always matches the descriptor's label names.
    pub fn label_values(&self, tag_labels: &[String]) -> Vec<String> {
        std::iter::once(self.identifier().to_string())
            .chain(
                tag_labels
                    .iter()
                    .map(|label| self.tags.get(label).cloned().unwrap_or_default()),
            )
            .collect()
    }
}
