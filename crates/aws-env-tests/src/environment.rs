//! The shared AWS test environment.
//!
//! Built once per test run, before any suite executes:
//!
//! 1. settings are read from the process environment
//! 2. the primary configuration is loaded and service clients are derived from it
//! 3. optional capabilities (metrics, interruption queue) are activated
//! 4. availability zones are discovered
//!
//! Any failure in steps 1, 2 and 4, or an interruption queue that was requested
//! but cannot be resolved, aborts construction. Metrics failures only degrade
//! the metrics writer.

use crate::capability::Capability;
use crate::clients::ServiceClients;
use crate::config::{ConfigHandle, ConfigSource, DefaultConfigSource};
use crate::error::EnvironmentError;
use crate::fixtures::{Ec2NodeClass, FixtureContext, ImageDefaults};
use crate::interruption::{self, InterruptionQueueProvider, QueueResolver};
use crate::metrics::{
    self, MetricRecord, MetricsError, MetricsWriter, WriteOutcome, WriteRecordsRequest,
};
use crate::settings::Settings;
use crate::topology::{self, ZoneInfo, ZoneLister};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Instant;
use tokio::runtime::Runtime;
use tokio::sync::OnceCell;

static SHARED: OnceCell<Environment> = OnceCell::const_new();

static HARNESS_RUNTIME: LazyLock<std::io::Result<Runtime>> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("aws-env-harness")
        .build()
});

/// The process-wide runtime the shared environment lives on.
///
/// SDK connection pools and the Timestream endpoint reload task are bound to
/// the runtime that created them. This one is never shut down, so the shared
/// environment stays usable for the whole run.
pub fn harness_runtime() -> Result<&'static Runtime, EnvironmentError> {
    HARNESS_RUNTIME
        .as_ref()
        .map_err(|e| EnvironmentError::Runtime(e.to_string()))
}

/// Run a live-suite body on the harness runtime.
///
/// Must be called from a plain `#[test]`, not from inside another runtime.
///
/// # Example
///
/// ```no_run
/// use aws_env_tests::environment::block_on;
/// use aws_env_tests::Environment;
///
/// block_on(async {
///     let env = Environment::shared().await.expect("environment");
///     assert!(!env.zones.is_empty());
/// })
/// .expect("harness runtime");
/// ```
pub fn block_on<F: Future>(future: F) -> Result<F::Output, EnvironmentError> {
    Ok(harness_runtime()?.block_on(future))
}

/// The AWS test environment.
///
/// Read-only after construction and shared by reference across concurrently
/// running tests. Adding any post-construction mutation would require an
/// `RwLock` or replacing the whole environment with a new snapshot.
#[derive(Debug)]
pub struct Environment {
    /// Primary region.
    pub region: String,

    /// Service clients bound to the primary configuration.
    pub clients: ServiceClients,

    /// Metrics writer (inert unless metrics are enabled and reachable).
    pub metrics: MetricsWriter,

    /// Interruption queue provider, when `INTERRUPTION_QUEUE` is set.
    pub interruption_queue: Capability<InterruptionQueueProvider>,

    /// Name of the cluster under test.
    pub cluster_name: String,

    /// Control-plane endpoint of the cluster under test.
    pub cluster_endpoint: String,

    /// Whether the cluster has no internet egress.
    pub private_cluster: bool,

    /// Zones of the primary region, in service order.
    pub zones: Vec<ZoneInfo>,

    config: ConfigHandle,
    fixtures: FixtureContext,
    metric_dimensions: BTreeMap<String, String>,
}

impl Environment {
    /// Get the process-wide environment, building it on first use.
    ///
    /// Construction runs on [`harness_runtime`] whichever runtime the caller
    /// is on; use its clients from [`block_on`]. Concurrent callers wait for
    /// the same construction. A failed construction is not cached, but every
    /// fatal error is a misconfiguration that a retry would hit again.
    pub async fn shared() -> Result<&'static Environment, EnvironmentError> {
        SHARED
            .get_or_try_init(|| async {
                harness_runtime()?
                    .spawn(Self::new())
                    .await
                    .map_err(|e| EnvironmentError::Runtime(e.to_string()))?
            })
            .await
    }

    /// Build an environment from the process environment and the default
    /// AWS provider chain.
    pub async fn new() -> Result<Self, EnvironmentError> {
        let settings = Settings::from_env()?;
        Self::from_settings(settings, &DefaultConfigSource).await
    }

    /// Build an environment from resolved settings against live AWS.
    pub async fn from_settings(
        settings: Settings,
        source: &dyn ConfigSource,
    ) -> Result<Self, EnvironmentError> {
        let config = Self::load_primary(&settings, source).await?;
        let clients = ServiceClients::new(&config);
        let sqs = aws_sdk_sqs::Client::new(config.sdk_config());
        let ec2 = clients.ec2.clone();

        Self::activate(settings, config, clients, source, &sqs, &ec2).await
    }

    /// Build an environment with injected queue and zone backends.
    ///
    /// Runs the same steps in the same order as [`Environment::from_settings`];
    /// only the queue lookup and the zone listing go through `queues` and
    /// `zone_lister` instead of SQS and EC2.
    pub async fn from_parts(
        settings: Settings,
        source: &dyn ConfigSource,
        queues: &dyn QueueResolver,
        zone_lister: &dyn ZoneLister,
    ) -> Result<Self, EnvironmentError> {
        let config = Self::load_primary(&settings, source).await?;
        let clients = ServiceClients::new(&config);

        Self::activate(settings, config, clients, source, queues, zone_lister).await
    }

    async fn load_primary(
        settings: &Settings,
        source: &dyn ConfigSource,
    ) -> Result<ConfigHandle, EnvironmentError> {
        tracing::info!(
            target: "aws_env.environment",
            region = %settings.region,
            cluster_name = %settings.cluster_name,
            private_cluster = settings.private_cluster,
            metrics_enabled = settings.metrics.enabled,
            interruption_queue = ?settings.interruption_queue,
            "Building AWS test environment"
        );

        Ok(source.load(&settings.region).await?)
    }

    async fn activate(
        settings: Settings,
        config: ConfigHandle,
        clients: ServiceClients,
        source: &dyn ConfigSource,
        queues: &dyn QueueResolver,
        zone_lister: &dyn ZoneLister,
    ) -> Result<Self, EnvironmentError> {
        let metrics = metrics::activate_metrics(&settings.metrics, source).await;
        let interruption_queue = interruption::activate_interruption_queue(
            settings.interruption_queue.as_deref(),
            &config,
            queues,
        )
        .await?;

        let zones = topology::discover_zones(zone_lister).await?;

        Ok(Self::assemble(
            settings,
            config,
            clients,
            metrics,
            interruption_queue,
            zones,
        ))
    }

    fn assemble(
        settings: Settings,
        config: ConfigHandle,
        clients: ServiceClients,
        metrics: MetricsWriter,
        interruption_queue: Capability<InterruptionQueueProvider>,
        zones: Vec<ZoneInfo>,
    ) -> Self {
        let fixtures = FixtureContext::from_settings(&settings);
        let metric_dimensions = crate::metrics::run_dimensions(&settings.metrics);

        Self {
            region: config.region().to_string(),
            clients,
            metrics,
            interruption_queue,
            cluster_name: settings.cluster_name,
            cluster_endpoint: settings.cluster_endpoint,
            private_cluster: settings.private_cluster,
            zones,
            config,
            fixtures,
            metric_dimensions,
        }
    }

    /// The primary configuration every client was built from.
    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Image defaults for this cluster mode.
    pub fn image_defaults(&self) -> &ImageDefaults {
        &self.fixtures.images
    }

    /// Fixture context captured at construction.
    pub fn fixture_context(&self) -> &FixtureContext {
        &self.fixtures
    }

    /// Default `EC2NodeClass` for the cluster under test.
    pub fn default_ec2_node_class(&self) -> Ec2NodeClass {
        self.fixtures.default_ec2_node_class()
    }

    /// Zones of a given type (e.g. only regular availability zones).
    pub fn zones_of_type<'a>(&'a self, zone_type: &'a str) -> impl Iterator<Item = &'a ZoneInfo> {
        self.zones.iter().filter(move |z| z.zone_type == zone_type)
    }

    /// Record a single measurement, tagged with the run dimensions.
    pub async fn record_metric(
        &self,
        name: &str,
        dimensions: &BTreeMap<String, String>,
        value: f64,
    ) -> Result<WriteOutcome, MetricsError> {
        let record = MetricRecord::new(name, value)
            .with_dimensions(&self.metric_dimensions)
            .with_dimensions(dimensions);

        self.metrics
            .write_records(WriteRecordsRequest::new(vec![record]))
            .await
    }

    /// Run `f` and record its wall-clock duration in seconds.
    ///
    /// Metric failures are logged, never returned: timing data must not fail
    /// the suite it measures.
    pub async fn measure_duration<F, Fut, T>(
        &self,
        name: &str,
        dimensions: &BTreeMap<String, String>,
        f: F,
    ) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let start = Instant::now();
        let result = f().await;
        let elapsed = start.elapsed().as_secs_f64();

        if let Err(e) = self.record_metric(name, dimensions, elapsed).await {
            tracing::warn!(
                target: "aws_env.metrics",
                metric = %name,
                error = %e,
                "Failed to record duration metric"
            );
        }

        result
    }
}
