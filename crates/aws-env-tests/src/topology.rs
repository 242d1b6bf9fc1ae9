//! Availability zone discovery.

use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::AvailabilityZone;
use serde::Serialize;
use thiserror::Error;

/// Zone type reported for regular availability zones.
pub const ZONE_TYPE_AVAILABILITY_ZONE: &str = "availability-zone";

/// Zone type reported for local zones.
pub const ZONE_TYPE_LOCAL_ZONE: &str = "local-zone";

/// Zone label written by the EBS CSI driver.
pub const EBS_CSI_ZONE_LABEL: &str = "topology.ebs.csi.aws.com/zone";

/// Well-known Kubernetes zone label.
pub const KUBERNETES_ZONE_LABEL: &str = "topology.kubernetes.io/zone";

/// Zone discovery errors.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("DescribeAvailabilityZones failed: {0}")]
    DescribeFailed(String),
}

/// A discovered zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneInfo {
    /// Zone name (e.g., "us-west-2a").
    pub zone: String,

    /// Account-independent zone ID (e.g., "usw2-az1").
    pub zone_id: String,

    /// Zone type (e.g., "availability-zone", "local-zone").
    pub zone_type: String,
}

impl ZoneInfo {
    /// Whether this is a local zone.
    pub fn is_local_zone(&self) -> bool {
        self.zone_type == ZONE_TYPE_LOCAL_ZONE
    }
}

impl From<&AvailabilityZone> for ZoneInfo {
    fn from(zone: &AvailabilityZone) -> Self {
        Self {
            zone: zone.zone_name().unwrap_or_default().to_string(),
            zone_id: zone.zone_id().unwrap_or_default().to_string(),
            zone_type: zone.zone_type().unwrap_or_default().to_string(),
        }
    }
}

/// Lists the availability zones of the configured region (enables mocking).
#[async_trait::async_trait]
pub trait ZoneLister: Send + Sync {
    /// Return the raw zone descriptors, in service order.
    async fn list_availability_zones(&self) -> Result<Vec<AvailabilityZone>, DiscoveryError>;
}

#[async_trait::async_trait]
impl ZoneLister for aws_sdk_ec2::Client {
    async fn list_availability_zones(&self) -> Result<Vec<AvailabilityZone>, DiscoveryError> {
        let output = self
            .describe_availability_zones()
            .send()
            .await
            .map_err(|e| DiscoveryError::DescribeFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(output.availability_zones().to_vec())
    }
}

/// Discover every zone in the region with a single listing call.
///
/// Missing fields on a zone default to the empty string; only a failure of
/// the listing call itself is an error.
pub async fn discover_zones(lister: &dyn ZoneLister) -> Result<Vec<ZoneInfo>, DiscoveryError> {
    let zones: Vec<ZoneInfo> = lister
        .list_availability_zones()
        .await?
        .iter()
        .map(ZoneInfo::from)
        .collect();

    tracing::info!(
        target: "aws_env.topology",
        zone_count = zones.len(),
        zones = ?zones.iter().map(|z| z.zone.as_str()).collect::<Vec<_>>(),
        "Discovered availability zones"
    );

    Ok(zones)
}

/// Map a node label key onto the label Karpenter normalizes it to.
///
/// The EBS CSI driver publishes its own zone label; suites compare it against
/// the well-known Kubernetes zone label.
pub fn normalized_label(key: &str) -> &str {
    match key {
        EBS_CSI_ZONE_LABEL => KUBERNETES_ZONE_LABEL,
        other => other,
    }
}

/// Mock zone listers for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock zone lister returning a fixed set of zones.
    #[derive(Debug)]
    pub struct MockZoneLister {
        zones: Vec<AvailabilityZone>,
        return_error: bool,
        call_count: AtomicUsize,
    }

    impl MockZoneLister {
        /// Create a mock returning `zones`.
        pub fn with_zones(zones: Vec<AvailabilityZone>) -> Self {
            Self {
                zones,
                return_error: false,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Create a mock whose listing call fails.
        pub fn failing() -> Self {
            Self {
                zones: Vec::new(),
                return_error: true,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    /// Build a fully populated zone descriptor.
    pub fn zone(name: &str, id: &str, zone_type: &str) -> AvailabilityZone {
        AvailabilityZone::builder()
            .zone_name(name)
            .zone_id(id)
            .zone_type(zone_type)
            .build()
    }

    #[async_trait::async_trait]
    impl ZoneLister for MockZoneLister {
        async fn list_availability_zones(
            &self,
        ) -> Result<Vec<AvailabilityZone>, DiscoveryError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);

            if self.return_error {
                return Err(DiscoveryError::DescribeFailed(
                    "Mock EC2 error".to_string(),
                ));
            }

            Ok(self.zones.clone())
        }
    }
}
