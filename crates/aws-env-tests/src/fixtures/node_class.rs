//! `EC2NodeClass` fixture types.
//!
//! A trimmed model of the `karpenter.k8s.aws/v1` `EC2NodeClass` resource,
//! covering the fields suites set. Serializes to the manifest shape the API
//! server accepts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// API version of the `EC2NodeClass` resource.
pub const API_VERSION: &str = "karpenter.k8s.aws/v1";

/// Kind of the `EC2NodeClass` resource.
pub const KIND: &str = "EC2NodeClass";

/// `EC2NodeClass` manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ec2NodeClass {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: Ec2NodeClassSpec,
}

/// Object metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// `EC2NodeClass` spec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ec2NodeClassSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnet_selector_terms: Vec<SubnetSelectorTerm>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security_group_selector_terms: Vec<SecurityGroupSelectorTerm>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ami_selector_terms: Vec<AmiSelectorTerm>,

    /// IAM role nodes assume. Mutually exclusive with `instance_profile`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Pre-provisioned instance profile. Mutually exclusive with `role`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_profile: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Subnet selector term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubnetSelectorTerm {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Security group selector term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupSelectorTerm {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// AMI selector term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmiSelectorTerm {
    /// Family alias such as `al2023@latest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// How nodes launched from a node class obtain their IAM identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIdentity<'a> {
    Role(&'a str),
    InstanceProfile(&'a str),
}

impl Ec2NodeClass {
    /// Base fixture with a random name and an empty spec.
    pub fn new() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self::named(format!("default-{}", suffix.get(..8).unwrap_or("00000000")))
    }

    /// Base fixture with a fixed name and an empty spec.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ObjectMeta {
                name: name.into(),
                labels: BTreeMap::new(),
            },
            spec: Ec2NodeClassSpec::default(),
        }
    }

    /// The identity this node class grants, if exactly one is set.
    ///
    /// Returns `None` when neither or both of role and instance profile are
    /// set; the API server rejects both shapes.
    pub fn identity(&self) -> Option<NodeIdentity<'_>> {
        match (&self.spec.role, &self.spec.instance_profile) {
            (Some(role), None) => Some(NodeIdentity::Role(role)),
            (None, Some(profile)) => Some(NodeIdentity::InstanceProfile(profile)),
            _ => None,
        }
    }
}

impl Default for Ec2NodeClass {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_unique_names() {
        let a = Ec2NodeClass::new();
        let b = Ec2NodeClass::new();

        assert!(a.metadata.name.starts_with("default-"));
        assert_eq!(a.metadata.name.len(), "default-".len() + 8);
        assert_ne!(a.metadata.name, b.metadata.name);
    }

    #[test]
    fn test_identity_requires_exactly_one() {
        let mut node_class = Ec2NodeClass::named("test");
        assert_eq!(node_class.identity(), None);

        node_class.spec.role = Some("KarpenterNodeRole-test".to_string());
        assert_eq!(
            node_class.identity(),
            Some(NodeIdentity::Role("KarpenterNodeRole-test"))
        );

        node_class.spec.instance_profile = Some("profile".to_string());
        assert_eq!(node_class.identity(), None);

        node_class.spec.role = None;
        assert_eq!(
            node_class.identity(),
            Some(NodeIdentity::InstanceProfile("profile"))
        );
    }

    #[test]
    fn test_serializes_manifest_shape() {
        let mut node_class = Ec2NodeClass::named("test");
        node_class.spec.role = Some("KarpenterNodeRole-test".to_string());
        node_class.spec.ami_selector_terms = vec![AmiSelectorTerm {
            alias: Some("al2023@latest".to_string()),
            ..Default::default()
        }];

        let json = serde_json::to_value(&node_class).expect("node class should serialize");

        assert_eq!(json["apiVersion"], API_VERSION);
        assert_eq!(json["kind"], KIND);
        assert_eq!(json["metadata"]["name"], "test");
        assert_eq!(json["spec"]["role"], "KarpenterNodeRole-test");
        assert_eq!(json["spec"]["amiSelectorTerms"][0]["alias"], "al2023@latest");
        assert!(json["spec"].get("instanceProfile").is_none());
        assert!(json["spec"].get("subnetSelectorTerms").is_none());
    }
}
