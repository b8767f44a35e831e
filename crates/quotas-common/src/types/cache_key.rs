//! CacheKey - stable identity of a cached metric

use std::fmt;

use serde::{Deserialize, Serialize};

use super::quota_usage::QuotaUsage;

/// Identity of one cached metric: quota name plus resource identifier.
///
/// Two resources sharing a quota name never collide, while a region scoped
/// quota collapses to a single key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub name: String,
    pub identifier: String,
}

impl CacheKey {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: identifier.into(),
        }
    }
}

impl From<&QuotaUsage> for CacheKey {
    fn from(usage: &QuotaUsage) -> Self {
        Self::new(usage.name.clone(), usage.identifier())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.identifier)
    }
}
