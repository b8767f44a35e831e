//! AWS partitions and the regions they contain

use crate::error::{QuotasError, Result};

const AWS_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-east-2",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-southeast-5",
    "ap-southeast-7",
    "ca-central-1",
    "ca-west-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "mx-central-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

const AWS_CN_REGIONS: &[&str] = &["cn-north-1", "cn-northwest-1"];

const AWS_US_GOV_REGIONS: &[&str] = &["us-gov-east-1", "us-gov-west-1"];

/// An AWS partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Standard commercial regions
    Aws,
    /// China regions
    AwsCn,
    /// GovCloud regions
    AwsUsGov,
}

impl Partition {
    /// All known partitions
    pub const ALL: [Partition; 3] = [Partition::Aws, Partition::AwsCn, Partition::AwsUsGov];

    /// Resolve the partition a region belongs to
    pub fn for_region(region: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.regions().contains(&region))
            .ok_or_else(|| QuotasError::InvalidRegion(region.to_string()))
    }

    /// Regions in this partition
    pub fn regions(&self) -> &'static [&'static str] {
        match self {
            Partition::Aws => AWS_REGIONS,
            Partition::AwsCn => AWS_CN_REGIONS,
            Partition::AwsUsGov => AWS_US_GOV_REGIONS,
        }
    }

    /// Whether the Service Quotas API is unavailable in this partition.
    ///
    /// Only standalone usage checks run in a restricted partition.
    pub fn is_restricted(&self) -> bool {
        matches!(self, Partition::AwsCn)
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Aws => write!(f, "aws"),
            Partition::AwsCn => write!(f, "aws-cn"),
            Partition::AwsUsGov => write!(f, "aws-us-gov"),
        }
    }
}
