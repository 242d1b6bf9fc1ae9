//! Environment construction errors.
//!
//! Every variant here is fatal: the test run cannot proceed with a partially
//! built environment. Messages name the variable or the call that failed so
//! misconfiguration can be localized from the test output alone.

use crate::config::ConfigError;
use crate::interruption::QueueError;
use crate::topology::DiscoveryError;
use thiserror::Error;

/// Fatal errors raised while building the [`crate::Environment`].
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for environment variable {name}: {message}")]
    InvalidEnvVar { name: String, message: String },

    #[error("Failed to load AWS configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to discover availability zones: {0}")]
    ZoneDiscovery(#[from] DiscoveryError),

    #[error("Harness runtime unavailable: {0}")]
    Runtime(String),

    #[error("Failed to resolve interruption queue '{queue}': {source}")]
    QueueLookup {
        queue: String,
        #[source]
        source: QueueError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_var_names_variable() {
        let err = EnvironmentError::MissingEnvVar("CLUSTER_NAME".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: CLUSTER_NAME"
        );
    }

    #[test]
    fn test_queue_lookup_names_queue() {
        let err = EnvironmentError::QueueLookup {
            queue: "karpenter-e2e".to_string(),
            source: QueueError::NotFound("karpenter-e2e".to_string()),
        };
        assert!(err.to_string().contains("'karpenter-e2e'"));
    }
}
