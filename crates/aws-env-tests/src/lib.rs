//! AWS E2E Test Environment
//!
//! This crate builds the shared environment that Karpenter end-to-end suites run
//! against on AWS. It loads provider configuration once, derives one client per
//! backing service from it, activates optional capabilities (Timestream metrics,
//! SQS interruption queue) based on environment variables, discovers the
//! availability zones of the region, and produces default `EC2NodeClass`
//! fixtures for the cluster under test.
//!
//! # Features
//!
//! - `smoke`: Build the real environment against AWS
//! - `metrics`: Timestream metric writes (requires `ENABLE_METRICS=true`)
//! - `interruption`: SQS interruption queue round trips (requires `INTERRUPTION_QUEUE`)
//! - `all`: Enable all live suites
//!
//! # Prerequisites
//!
//! 1. AWS credentials resolvable by the default provider chain
//! 2. `AWS_REGION`, `CLUSTER_NAME` and `CLUSTER_ENDPOINT` exported
//! 3. Optional: `PRIVATE_CLUSTER`, `ENABLE_METRICS`, `METRICS_REGION`, `INTERRUPTION_QUEUE`
//!
//! # Usage
//!
//! ```bash
//! # Offline suites only (no AWS access needed)
//! cargo test -p aws-env-tests
//!
//! # Live environment construction
//! cargo test -p aws-env-tests --features smoke
//!
//! # Everything, including metrics and interruption suites
//! cargo test -p aws-env-tests --features all
//! ```

pub mod capability;
pub mod clients;
pub mod config;
pub mod environment;
pub mod error;
pub mod eventual;
pub mod fixtures;
pub mod interruption;
pub mod logging;
pub mod metrics;
pub mod settings;
pub mod topology;

pub use capability::Capability;
pub use environment::Environment;
pub use error::EnvironmentError;
pub use settings::Settings;
