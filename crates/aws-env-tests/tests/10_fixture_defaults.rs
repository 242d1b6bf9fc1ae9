//! Fixture Defaults
//!
//! Offline tests for the default `EC2NodeClass` across cluster modes. These run
//! without AWS access and without any cargo feature.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use aws_env_tests::fixtures::{
    FixtureContext, ImageDefaults, NodeIdentity, DEFAULT_AMI_ALIAS, DISCOVERY_TAG,
    TESTING_CLUSTER_TAG,
};
use aws_env_tests::settings::{
    AWS_REGION, CLUSTER_ENDPOINT, CLUSTER_NAME, INTERRUPTION_QUEUE, PRIVATE_CLUSTER,
};
use aws_env_tests::Settings;
use std::collections::HashMap;

fn base_vars(cluster_name: &str) -> HashMap<String, String> {
    HashMap::from([
        (AWS_REGION.to_string(), "us-west-2".to_string()),
        (CLUSTER_NAME.to_string(), cluster_name.to_string()),
        (
            CLUSTER_ENDPOINT.to_string(),
            "https://ABCDEF.gr7.us-west-2.eks.amazonaws.com".to_string(),
        ),
    ])
}

fn context(vars: &HashMap<String, String>) -> FixtureContext {
    let settings = Settings::from_vars(vars).expect("Settings should load");
    FixtureContext::from_settings(&settings)
}

#[test]
fn test_public_cluster_end_to_end() {
    let vars = base_vars("test-cluster");
    let settings = Settings::from_vars(&vars).expect("Settings should load");

    assert_eq!(settings.region, "us-west-2");
    assert!(!settings.metrics.enabled);
    assert_eq!(settings.interruption_queue, None);

    let node_class = FixtureContext::from_settings(&settings).default_ec2_node_class();

    assert_eq!(
        node_class.spec.role.as_deref(),
        Some("KarpenterNodeRole-test-cluster")
    );
    assert_eq!(node_class.spec.instance_profile, None);
}

#[test]
fn test_private_cluster_end_to_end() {
    let mut vars = base_vars("test-cluster");
    vars.insert(PRIVATE_CLUSTER.to_string(), "true".to_string());

    let node_class = context(&vars).default_ec2_node_class();

    assert_eq!(
        node_class.spec.instance_profile.as_deref(),
        Some("KarpenterNodeInstanceProfile-test-cluster")
    );
    assert_eq!(node_class.spec.role, None);
}

#[test]
fn test_exactly_one_identity_for_every_mode_and_name() {
    for cluster_name in ["a", "test-cluster", "karpenter-e2e-1234567890"] {
        for private in [false, true] {
            let mut vars = base_vars(cluster_name);
            if private {
                vars.insert(PRIVATE_CLUSTER.to_string(), String::new());
            }

            let node_class = context(&vars).default_ec2_node_class();

            match node_class.identity() {
                Some(NodeIdentity::Role(role)) => {
                    assert!(!private, "{}: public mode uses a role", cluster_name);
                    assert!(role.ends_with(cluster_name));
                }
                Some(NodeIdentity::InstanceProfile(profile)) => {
                    assert!(private, "{}: private mode uses a profile", cluster_name);
                    assert!(profile.ends_with(cluster_name));
                }
                None => panic!("{}: exactly one identity must be set", cluster_name),
            }
        }
    }
}

#[test]
fn test_selectors_and_tags_keyed_by_cluster() {
    let node_class = context(&base_vars("team-a")).default_ec2_node_class();

    assert!(!node_class.spec.security_group_selector_terms.is_empty());
    assert!(!node_class.spec.subnet_selector_terms.is_empty());
    for tags in node_class
        .spec
        .security_group_selector_terms
        .iter()
        .map(|t| &t.tags)
        .chain(node_class.spec.subnet_selector_terms.iter().map(|t| &t.tags))
    {
        assert_eq!(tags.get(DISCOVERY_TAG).map(String::as_str), Some("team-a"));
    }

    assert_eq!(
        node_class.spec.tags.get(TESTING_CLUSTER_TAG).map(String::as_str),
        Some("team-a")
    );
    assert_eq!(
        node_class.spec.ami_selector_terms[0].alias.as_deref(),
        Some(DEFAULT_AMI_ALIAS)
    );
}

#[test]
fn test_image_defaults_follow_mode() {
    assert_eq!(
        context(&base_vars("test-cluster")).images,
        ImageDefaults::public()
    );

    let mut vars = base_vars("test-cluster");
    vars.insert(PRIVATE_CLUSTER.to_string(), String::new());
    assert_eq!(context(&vars).images, ImageDefaults::private("us-west-2"));
}

#[test]
fn test_queue_setting_does_not_affect_fixtures() {
    let mut vars = base_vars("test-cluster");
    let without_queue = context(&vars);

    vars.insert(INTERRUPTION_QUEUE.to_string(), "test-cluster".to_string());
    let with_queue = context(&vars);

    assert_eq!(without_queue, with_queue);
}

#[test]
fn test_node_class_manifest_is_valid_json() {
    let node_class = context(&base_vars("test-cluster")).default_ec2_node_class();

    let json = serde_json::to_string(&node_class).expect("node class should serialize");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(parsed["kind"], "EC2NodeClass");
    assert_eq!(
        parsed["spec"]["securityGroupSelectorTerms"][0]["tags"][DISCOVERY_TAG],
        "test-cluster"
    );
    assert_eq!(
        parsed["spec"]["subnetSelectorTerms"][0]["tags"][DISCOVERY_TAG],
        "test-cluster"
    );
}
