//! Environment settings.
//!
//! This is the only place the harness reads process environment variables.
//! Everything downstream receives the resolved, typed [`Settings`].

use crate::error::EnvironmentError;
use std::collections::HashMap;
use std::env;

/// Primary AWS region (required).
pub const AWS_REGION: &str = "AWS_REGION";

/// Name of the cluster under test (required).
pub const CLUSTER_NAME: &str = "CLUSTER_NAME";

/// Control-plane endpoint of the cluster under test (required).
pub const CLUSTER_ENDPOINT: &str = "CLUSTER_ENDPOINT";

/// Presence switches the harness into private-cluster mode.
pub const PRIVATE_CLUSTER: &str = "PRIVATE_CLUSTER";

/// Boolean flag enabling Timestream metric emission.
pub const ENABLE_METRICS: &str = "ENABLE_METRICS";

/// Region used for the metrics client only.
pub const METRICS_REGION: &str = "METRICS_REGION";

/// Name of the SQS queue Karpenter consumes interruption events from.
pub const INTERRUPTION_QUEUE: &str = "INTERRUPTION_QUEUE";

/// Git ref of the code under test, attached to emitted metrics.
pub const GIT_REF: &str = "GIT_REF";

/// CI run identifier, attached to emitted metrics.
pub const GITHUB_RUN_ID: &str = "GITHUB_RUN_ID";

/// Default region for the metrics client.
pub const DEFAULT_METRICS_REGION: &str = "us-east-2";

/// Resolved harness settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Primary AWS region (e.g., "us-west-2").
    pub region: String,

    /// Cluster name, used for tagging, selectors and identity names.
    pub cluster_name: String,

    /// Cluster control-plane endpoint, passed through to suites.
    pub cluster_endpoint: String,

    /// Whether the cluster has no internet egress.
    pub private_cluster: bool,

    /// Metrics capability settings.
    pub metrics: MetricsSettings,

    /// Interruption queue name; `None` disables interruption testing.
    ///
    /// Presence-based like `private_cluster`: an empty value is still a
    /// requested queue and must resolve.
    pub interruption_queue: Option<String>,
}

/// Settings for the metrics capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSettings {
    /// Whether metric emission is enabled (default: false).
    pub enabled: bool,

    /// Region for the Timestream client (default: "us-east-2").
    pub region: String,

    /// Git ref dimension, if known.
    pub git_ref: Option<String>,

    /// CI run identifier dimension, if known.
    pub run_id: Option<String>,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, EnvironmentError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load settings from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, EnvironmentError> {
        let region = required(vars, AWS_REGION)?;
        let cluster_name = required(vars, CLUSTER_NAME)?;
        let cluster_endpoint = required(vars, CLUSTER_ENDPOINT)?;

        // Presence-based: PRIVATE_CLUSTER="" still means private.
        let private_cluster = vars.contains_key(PRIVATE_CLUSTER);

        let enabled = match vars.get(ENABLE_METRICS) {
            Some(value) => parse_bool(value).ok_or_else(|| EnvironmentError::InvalidEnvVar {
                name: ENABLE_METRICS.to_string(),
                message: format!("expected a boolean, got '{}'", value),
            })?,
            None => false,
        };

        let metrics = MetricsSettings {
            enabled,
            region: optional(vars, METRICS_REGION)
                .unwrap_or_else(|| DEFAULT_METRICS_REGION.to_string()),
            git_ref: optional(vars, GIT_REF),
            run_id: optional(vars, GITHUB_RUN_ID),
        };

        Ok(Settings {
            region,
            cluster_name,
            cluster_endpoint,
            private_cluster,
            metrics,
            interruption_queue: vars.get(INTERRUPTION_QUEUE).cloned(),
        })
    }
}

/// Required variables must be present and non-empty.
fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, EnvironmentError> {
    optional(vars, name).ok_or_else(|| EnvironmentError::MissingEnvVar(name.to_string()))
}

fn optional(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Accepts `1`, `t`, `true` and `0`, `f`, `false` in lower, upper or title case.
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
