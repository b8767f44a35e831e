//! Error types for the quotas exporter
//!
//! Provides a unified error type shared by the checks, the aggregator and
//! the metric cache.

use thiserror::Error;

/// Result type alias using QuotasError
pub type Result<T> = std::result::Result<T, QuotasError>;

/// Unified error type for quotas exporter operations
#[derive(Debug, Error)]
pub enum QuotasError {
    // Construction errors
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    // Provider errors
    #[error("Failed to list quotas for service {service}: {source}")]
    FailedToListQuotas {
        service: String,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to get usage for {check}: {source}")]
    FailedToGetUsage {
        check: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("Failed to convert CIDR block from string to int: {0}")]
    FailedToConvertCidr(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Metric descriptor errors
    #[error("Descriptor error: {0}")]
    Descriptor(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuotasError {
    /// Wrap a provider failure raised while a usage check was running
    pub fn usage(check: &'static str, source: ProviderError) -> Self {
        QuotasError::FailedToGetUsage { check, source }
    }

    /// Wrap a provider failure raised while listing a service's quotas
    pub fn list_quotas(service: impl Into<String>, source: ProviderError) -> Self {
        QuotasError::FailedToListQuotas {
            service: service.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        QuotasError::Config(msg.into())
    }
}

// Implement From for common external error types
impl From<prometheus::Error> for QuotasError {
    fn from(err: prometheus::Error) -> Self {
        QuotasError::Descriptor(err.to_string())
    }
}

/// Failure reported by a cloud provider client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation}: {message}")]
pub struct ProviderError {
    /// Provider operation that failed (e.g. `DescribeSubnets`)
    pub operation: String,
    /// Provider-supplied failure message
    pub message: String,
}

impl ProviderError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}
