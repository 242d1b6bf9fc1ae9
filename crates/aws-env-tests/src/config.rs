//! AWS configuration loading.
//!
//! The harness loads one [`ConfigHandle`] for the primary region and, when
//! metrics are enabled, a second one for the metrics region. Every service
//! client is derived from a handle, so credentials and retry policy are
//! resolved exactly once per handle and cannot drift between clients.

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_sts::error::DisplayErrorContext;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, LazyLock};
use thiserror::Error;

/// Maximum attempts (initial call plus retries) for every AWS request.
pub const MAX_ATTEMPTS: u32 = 10;

#[allow(clippy::expect_used)] // literal pattern
static REGION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2,4}(-[a-z]+)+-\d+$").expect("valid region pattern"));

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid AWS region '{0}'")]
    InvalidRegion(String),

    #[error("Loaded configuration has no region")]
    MissingRegion,

    #[error("No credentials provider configured for region {0}")]
    NoCredentialsProvider(String),

    #[error("Failed to resolve credentials for region {region}: {message}")]
    Credentials { region: String, message: String },
}

/// Immutable, shared AWS configuration.
///
/// Cloning is cheap; all clones point at the same loaded config.
#[derive(Clone)]
pub struct ConfigHandle {
    sdk: Arc<SdkConfig>,
    region: String,
}

impl ConfigHandle {
    /// Wrap an already-loaded SDK config.
    ///
    /// The config must carry a region; clients built without one fail on
    /// first use with an opaque endpoint error.
    pub fn from_sdk_config(sdk: SdkConfig) -> Result<Self, ConfigError> {
        let region = sdk
            .region()
            .map(|r| r.as_ref().to_string())
            .ok_or(ConfigError::MissingRegion)?;

        Ok(Self {
            sdk: Arc::new(sdk),
            region,
        })
    }

    /// Get the underlying SDK config for client construction.
    pub fn sdk_config(&self) -> &SdkConfig {
        &self.sdk
    }

    /// Get the region string.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Maximum attempts of the installed retry policy, if any.
    pub fn max_attempts(&self) -> Option<u32> {
        self.sdk.retry_config().map(RetryConfig::max_attempts)
    }
}

impl fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("region", &self.region)
            .field("max_attempts", &self.max_attempts())
            .finish_non_exhaustive()
    }
}

/// Validate the shape of a region name (e.g. "us-west-2", "us-gov-east-1").
pub fn validate_region(region: &str) -> Result<(), ConfigError> {
    if REGION_PATTERN.is_match(region) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRegion(region.to_string()))
    }
}

/// The retry policy every handle carries.
pub fn retry_policy() -> RetryConfig {
    RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS)
}

/// Source of configuration handles (enables mocking).
#[async_trait::async_trait]
pub trait ConfigSource: Send + Sync {
    /// Load a configuration handle scoped to `region`.
    async fn load(&self, region: &str) -> Result<ConfigHandle, ConfigError>;
}

/// Loads configuration from the default AWS provider chain.
///
/// STS calls go to the regional endpoint, which is the SDK default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConfigSource;

#[async_trait::async_trait]
impl ConfigSource for DefaultConfigSource {
    async fn load(&self, region: &str) -> Result<ConfigHandle, ConfigError> {
        validate_region(region)?;

        let sdk = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .retry_config(retry_policy())
            .load()
            .await;

        resolve_credentials(&sdk, region).await?;

        tracing::debug!(
            target: "aws_env.config",
            region = %region,
            max_attempts = MAX_ATTEMPTS,
            "AWS configuration loaded"
        );

        ConfigHandle::from_sdk_config(sdk)
    }
}

/// Resolve credentials once so a broken provider chain fails construction
/// instead of the first test that touches AWS.
async fn resolve_credentials(sdk: &SdkConfig, region: &str) -> Result<(), ConfigError> {
    let provider = sdk
        .credentials_provider()
        .ok_or_else(|| ConfigError::NoCredentialsProvider(region.to_string()))?;

    provider
        .provide_credentials()
        .await
        .map_err(|e| ConfigError::Credentials {
            region: region.to_string(),
            message: DisplayErrorContext(&e).to_string(),
        })?;

    Ok(())
}

/// Mock configuration sources for testing.
///
/// Handles built here carry static credentials and never touch the network.
pub mod mock {
    use super::*;
    use aws_credential_types::provider::SharedCredentialsProvider;
    use aws_credential_types::Credentials;
    use std::sync::Mutex;

    /// Build an offline handle with static credentials for `region`.
    pub fn offline_handle(region: &str) -> Result<ConfigHandle, ConfigError> {
        validate_region(region)?;

        let credentials = Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
            None,
            None,
            "aws-env-tests-static",
        );

        let sdk = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(SharedCredentialsProvider::new(credentials))
            .retry_config(retry_policy())
            .build();

        ConfigHandle::from_sdk_config(sdk)
    }

    /// Mock config source that records every requested region.
    #[derive(Debug, Default)]
    pub struct MockConfigSource {
        /// Regions `load` was called with, in order.
        requested: Mutex<Vec<String>>,
        /// Regions that fail credential resolution.
        failing_regions: Vec<String>,
    }

    impl MockConfigSource {
        /// Create a mock that loads every region successfully.
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a mock whose credential resolution fails for `region`.
        pub fn failing_for(region: &str) -> Self {
            Self {
                requested: Mutex::new(Vec::new()),
                failing_regions: vec![region.to_string()],
            }
        }

        /// Regions requested so far.
        pub fn requested_regions(&self) -> Vec<String> {
            self.requested
                .lock()
                .map(|regions| regions.clone())
                .unwrap_or_default()
        }

        /// Number of `load` calls made.
        pub fn call_count(&self) -> usize {
            self.requested_regions().len()
        }
    }

    #[async_trait::async_trait]
    impl ConfigSource for MockConfigSource {
        async fn load(&self, region: &str) -> Result<ConfigHandle, ConfigError> {
            if let Ok(mut requested) = self.requested.lock() {
                requested.push(region.to_string());
            }

            if self.failing_regions.iter().any(|r| r == region) {
                return Err(ConfigError::Credentials {
                    region: region.to_string(),
                    message: "mock credential failure".to_string(),
                });
            }

            offline_handle(region)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::*;
    use super::*;

    #[test]
    fn test_validate_region_accepts_known_shapes() {
        for region in [
            "us-west-2",
            "eu-central-1",
            "us-gov-east-1",
            "ap-southeast-4",
            "eusc-de-east-1",
        ] {
            assert!(validate_region(region).is_ok(), "{} should be valid", region);
        }
    }

    #[test]
    fn test_validate_region_rejects_malformed() {
        for region in ["", "us-west", "US-WEST-2", "us_west_2", "us-west-2 "] {
            assert!(
                matches!(validate_region(region), Err(ConfigError::InvalidRegion(_))),
                "{:?} should be rejected",
                region
            );
        }
    }

    #[test]
    fn test_offline_handle_carries_region_and_retry_policy() {
        let handle = offline_handle("us-west-2").expect("handle should build");

        assert_eq!(handle.region(), "us-west-2");
        assert_eq!(handle.max_attempts(), Some(MAX_ATTEMPTS));
    }

    #[test]
    fn test_from_sdk_config_requires_region() {
        let sdk = SdkConfig::builder()
            .behavior_version(BehaviorVersion::latest())
            .build();

        let result = ConfigHandle::from_sdk_config(sdk);
        assert!(matches!(result, Err(ConfigError::MissingRegion)));
    }

    #[test]
    fn test_debug_omits_credentials() {
        let handle = offline_handle("us-west-2").expect("handle should build");
        let debug_output = format!("{:?}", handle);

        assert!(debug_output.contains("us-west-2"));
        assert!(!debug_output.contains("AKIDEXAMPLE"));
    }

    #[tokio::test]
    async fn test_default_source_rejects_malformed_region_before_loading() {
        let result = DefaultConfigSource.load("not a region").await;
        assert!(matches!(result, Err(ConfigError::InvalidRegion(r)) if r == "not a region"));
    }

    #[tokio::test]
    async fn test_mock_source_records_regions_and_fails_on_request() {
        let source = MockConfigSource::failing_for("eu-west-1");

        assert!(source.load("us-west-2").await.is_ok());
        assert!(matches!(
            source.load("eu-west-1").await,
            Err(ConfigError::Credentials { region, .. }) if region == "eu-west-1"
        ));
        assert_eq!(source.requested_regions(), vec!["us-west-2", "eu-west-1"]);
    }
}
