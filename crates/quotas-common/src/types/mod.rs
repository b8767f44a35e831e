//! Core data types shared by the checks and the metric cache

pub mod cache_key;
pub mod quota_usage;
