//! Container image defaults per cluster mode.
//!
//! Private clusters have no internet egress, so fixtures pull from ECR pull
//! through caches in the cluster's region instead of public registries.

/// Account hosting the ECR pull-through caches private clusters use.
pub const PRIVATE_ECR_ACCOUNT: &str = "857221689048";

/// Public Windows pause image.
pub const PUBLIC_WINDOWS_PAUSE_IMAGE: &str = "mcr.microsoft.com/oss/kubernetes/pause:3.9";

/// Public init container image for ephemeral storage tests.
pub const PUBLIC_EPHEMERAL_INIT_CONTAINER_IMAGE: &str = "alpine";

/// Public pause image used by default pod fixtures.
pub const PUBLIC_PAUSE_IMAGE: &str = "public.ecr.aws/eks-distro/kubernetes/pause:3.2";

/// Image defaults for one cluster mode, chosen once at environment
/// construction and passed to every fixture builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDefaults {
    /// Pause image for Windows node tests.
    pub windows_pause: String,

    /// Init container image for ephemeral storage tests.
    pub ephemeral_init_container: String,

    /// Pause image for default pod fixtures.
    pub pause: String,
}

impl ImageDefaults {
    /// Images pulled from public registries.
    pub fn public() -> Self {
        Self {
            windows_pause: PUBLIC_WINDOWS_PAUSE_IMAGE.to_string(),
            ephemeral_init_container: PUBLIC_EPHEMERAL_INIT_CONTAINER_IMAGE.to_string(),
            pause: PUBLIC_PAUSE_IMAGE.to_string(),
        }
    }

    /// Images pulled through the regional ECR caches.
    pub fn private(region: &str) -> Self {
        let registry = format!("{}.dkr.ecr.{}.amazonaws.com", PRIVATE_ECR_ACCOUNT, region);

        Self {
            windows_pause: format!("{}/k8s/pause:3.6", registry),
            ephemeral_init_container: format!(
                "{}/ecr-public/docker/library/alpine:latest",
                registry
            ),
            pause: format!("{}/ecr-public/eks-distro/kubernetes/pause:3.2", registry),
        }
    }

    /// Select the defaults for a cluster mode.
    pub fn for_mode(private_cluster: bool, region: &str) -> Self {
        if private_cluster {
            Self::private(region)
        } else {
            Self::public()
        }
    }
}
