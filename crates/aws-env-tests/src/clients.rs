//! AWS service clients shared by every suite.

use crate::config::ConfigHandle;

/// One client per backing service, all derived from the same [`ConfigHandle`].
///
/// Construction performs no network calls and cannot fail; errors surface on
/// first use. SDK clients are immutable, so a suite cannot reconfigure one
/// client independently of the others.
#[derive(Debug, Clone)]
pub struct ServiceClients {
    /// Compute (instances, subnets, security groups, zones).
    pub ec2: aws_sdk_ec2::Client,

    /// Identity (node roles, instance profiles).
    pub iam: aws_sdk_iam::Client,

    /// Fault injection (spot interruption experiments).
    pub fis: aws_sdk_fis::Client,

    /// Orchestration control plane (cluster, addons).
    pub eks: aws_sdk_eks::Client,

    /// Secure parameter store (AMI parameters).
    pub ssm: aws_sdk_ssm::Client,

    /// Security token service (account identity).
    pub sts: aws_sdk_sts::Client,
}

impl ServiceClients {
    /// Build every client from `config`.
    pub fn new(config: &ConfigHandle) -> Self {
        let sdk = config.sdk_config();

        Self {
            ec2: aws_sdk_ec2::Client::new(sdk),
            iam: aws_sdk_iam::Client::new(sdk),
            fis: aws_sdk_fis::Client::new(sdk),
            eks: aws_sdk_eks::Client::new(sdk),
            ssm: aws_sdk_ssm::Client::new(sdk),
            sts: aws_sdk_sts::Client::new(sdk),
        }
    }
}
