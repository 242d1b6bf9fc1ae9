//! Test fixtures for the cluster under test.

pub mod images;
pub mod node_class;

pub use images::ImageDefaults;
pub use node_class::{Ec2NodeClass, NodeIdentity};

use crate::settings::Settings;
use node_class::{AmiSelectorTerm, SecurityGroupSelectorTerm, SubnetSelectorTerm};
use std::collections::BTreeMap;

/// Tag Karpenter discovers subnets and security groups by.
pub const DISCOVERY_TAG: &str = "karpenter.sh/discovery";

/// Tag identifying resources owned by a test cluster.
pub const TESTING_CLUSTER_TAG: &str = "testing/cluster";

/// AMI alias pinned for default node classes.
pub const DEFAULT_AMI_ALIAS: &str = "al2023@latest";

/// Prefix of the node role public clusters use.
pub const NODE_ROLE_PREFIX: &str = "KarpenterNodeRole";

/// Prefix of the instance profile private clusters use.
pub const NODE_INSTANCE_PROFILE_PREFIX: &str = "KarpenterNodeInstanceProfile";

/// Everything fixture builders need from the environment, captured once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureContext {
    pub cluster_name: String,
    pub private_cluster: bool,
    pub images: ImageDefaults,
}

impl FixtureContext {
    /// Capture the fixture context for a run.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cluster_name: settings.cluster_name.clone(),
            private_cluster: settings.private_cluster,
            images: ImageDefaults::for_mode(settings.private_cluster, &settings.region),
        }
    }

    /// Node role name for this cluster.
    pub fn node_role(&self) -> String {
        format!("{}-{}", NODE_ROLE_PREFIX, self.cluster_name)
    }

    /// Instance profile name for this cluster.
    pub fn node_instance_profile(&self) -> String {
        format!("{}-{}", NODE_INSTANCE_PROFILE_PREFIX, self.cluster_name)
    }

    /// Default `EC2NodeClass` for this cluster.
    ///
    /// Subnets and security groups are both selected by the discovery tag; a
    /// node class with only one of them does not resolve networking uniquely
    /// in a shared account. Private clusters use the pre-provisioned instance
    /// profile, public clusters let Karpenter manage one from the node role.
    pub fn default_ec2_node_class(&self) -> Ec2NodeClass {
        let mut node_class = Ec2NodeClass::new();
        let discovery = BTreeMap::from([(DISCOVERY_TAG.to_string(), self.cluster_name.clone())]);

        node_class.spec.ami_selector_terms = vec![AmiSelectorTerm {
            alias: Some(DEFAULT_AMI_ALIAS.to_string()),
            ..Default::default()
        }];
        node_class.spec.tags =
            BTreeMap::from([(TESTING_CLUSTER_TAG.to_string(), self.cluster_name.clone())]);
        node_class.spec.security_group_selector_terms = vec![SecurityGroupSelectorTerm {
            tags: discovery.clone(),
            ..Default::default()
        }];
        node_class.spec.subnet_selector_terms = vec![SubnetSelectorTerm {
            tags: discovery,
            ..Default::default()
        }];

        if self.private_cluster {
            node_class.spec.role = None;
            node_class.spec.instance_profile = Some(self.node_instance_profile());
            return node_class;
        }

        node_class.spec.role = Some(self.node_role());
        node_class
    }
}
