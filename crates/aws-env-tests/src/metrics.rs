//! Metrics capability.
//!
//! Scale and performance suites record durations to Amazon Timestream so runs
//! can be compared over time. Emission is best-effort: when `ENABLE_METRICS`
//! is unset, or the metrics configuration cannot be loaded, suites get an
//! inert writer that accepts every write and records nothing. Callers use the
//! same [`MetricsWriter::write_records`] call either way.

use crate::config::{ConfigHandle, ConfigSource};
use crate::settings::MetricsSettings;
use aws_sdk_timestreamwrite::error::DisplayErrorContext;
use aws_sdk_timestreamwrite::types::{
    Dimension, DimensionValueType, MeasureValueType, Record, TimeUnit,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Timestream database metrics are written to.
pub const METRICS_DATABASE: &str = "karpenterTesting";

/// Timestream table metrics are written to.
pub const METRICS_TABLE: &str = "scaleTestDurations";

/// Dimension carrying the git ref of the code under test.
pub const GIT_REF_DIMENSION: &str = "gitRef";

/// Dimension carrying the CI run identifier.
pub const RUN_ID_DIMENSION: &str = "runId";

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Invalid metric record: {0}")]
    InvalidRecord(String),

    #[error("Timestream endpoint discovery failed: {0}")]
    EndpointDiscovery(String),

    #[error("WriteRecords failed: {0}")]
    WriteFailed(String),
}

/// A single metric measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub name: String,
    pub value: f64,
    pub dimensions: BTreeMap<String, String>,
    pub time: DateTime<Utc>,
}

impl MetricRecord {
    /// Create a measurement taken now.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            dimensions: BTreeMap::new(),
            time: Utc::now(),
        }
    }

    /// Add a dimension.
    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(name.into(), value.into());
        self
    }

    /// Add every dimension in `dimensions`, overwriting existing names.
    pub fn with_dimensions(mut self, dimensions: &BTreeMap<String, String>) -> Self {
        self.dimensions
            .extend(dimensions.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    fn to_sdk_record(&self) -> Result<Record, MetricsError> {
        if self.name.is_empty() {
            return Err(MetricsError::InvalidRecord(
                "measure name must not be empty".to_string(),
            ));
        }

        let dimensions = self
            .dimensions
            .iter()
            .map(|(name, value)| {
                Dimension::builder()
                    .name(name)
                    .value(value)
                    .dimension_value_type(DimensionValueType::Varchar)
                    .build()
                    .map_err(|e| MetricsError::InvalidRecord(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Record::builder()
            .measure_name(&self.name)
            .measure_value(self.value.to_string())
            .measure_value_type(MeasureValueType::Double)
            .time(self.time.timestamp_millis().to_string())
            .time_unit(TimeUnit::Milliseconds)
            .set_dimensions(Some(dimensions))
            .build())
    }
}

/// A batch of records for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecordsRequest {
    pub database: String,
    pub table: String,
    pub records: Vec<MetricRecord>,
}

impl WriteRecordsRequest {
    /// Target the default testing database and table.
    pub fn new(records: Vec<MetricRecord>) -> Self {
        Self {
            database: METRICS_DATABASE.to_string(),
            table: METRICS_TABLE.to_string(),
            records,
        }
    }
}

/// Result of a write. The inert writer returns the default (nothing ingested).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub records_ingested: i32,
}

/// Aborts a background task once the last owner is dropped.
#[derive(Debug)]
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Timestream Write client bound to the metrics region.
#[derive(Debug, Clone)]
pub struct TimestreamWriter {
    client: aws_sdk_timestreamwrite::Client,
    region: String,
    /// Endpoint reload task, stopped with the last clone of the writer.
    _reload: Arc<AbortOnDrop>,
}

impl TimestreamWriter {
    /// Build the client and run the initial endpoint discovery.
    ///
    /// Timestream only accepts requests on discovered cell endpoints. The
    /// reload task keeps them fresh for as long as the writer is alive.
    pub async fn connect(config: &ConfigHandle) -> Result<Self, MetricsError> {
        let (client, reload) = aws_sdk_timestreamwrite::Client::new(config.sdk_config())
            .with_endpoint_discovery_enabled()
            .await
            .map_err(|e| MetricsError::EndpointDiscovery(e.to_string()))?;

        let reload = AbortOnDrop(tokio::spawn(reload.reload_task()));

        Ok(Self {
            client,
            region: config.region().to_string(),
            _reload: Arc::new(reload),
        })
    }

    /// Region the client writes to.
    pub fn region(&self) -> &str {
        &self.region
    }

    async fn write(&self, request: &WriteRecordsRequest) -> Result<WriteOutcome, MetricsError> {
        let records = request
            .records
            .iter()
            .map(MetricRecord::to_sdk_record)
            .collect::<Result<Vec<_>, _>>()?;

        let output = self
            .client
            .write_records()
            .database_name(&request.database)
            .table_name(&request.table)
            .set_records(Some(records))
            .send()
            .await
            .map_err(|e| MetricsError::WriteFailed(DisplayErrorContext(&e).to_string()))?;

        Ok(WriteOutcome {
            records_ingested: output.records_ingested().map(|r| r.total()).unwrap_or_default(),
        })
    }
}

/// Metrics writer: a live Timestream client or an inert stand-in.
#[derive(Debug, Clone)]
pub enum MetricsWriter {
    /// Writes go to Timestream.
    Active(TimestreamWriter),

    /// Writes succeed without side effects.
    Inert,
}

impl MetricsWriter {
    /// Write a batch of records.
    ///
    /// The inert writer returns an empty success for any input.
    pub async fn write_records(
        &self,
        request: WriteRecordsRequest,
    ) -> Result<WriteOutcome, MetricsError> {
        match self {
            MetricsWriter::Active(writer) => writer.write(&request).await,
            MetricsWriter::Inert => Ok(WriteOutcome::default()),
        }
    }

    /// Whether writes reach Timestream.
    pub fn is_active(&self) -> bool {
        matches!(self, MetricsWriter::Active(_))
    }

    /// Region of the live writer, if any.
    pub fn region(&self) -> Option<&str> {
        match self {
            MetricsWriter::Active(writer) => Some(writer.region()),
            MetricsWriter::Inert => None,
        }
    }
}

/// Load the metrics configuration, if metrics are enabled.
///
/// Returns `None` both when metrics are disabled and when the configuration
/// cannot be loaded. The two cases are logged at different levels so a
/// silently degraded run is visible in the test output.
pub async fn resolve_metrics_config(
    settings: &MetricsSettings,
    source: &dyn ConfigSource,
) -> Option<ConfigHandle> {
    if !settings.enabled {
        tracing::debug!(target: "aws_env.metrics", "Metrics emission disabled");
        return None;
    }

    match source.load(&settings.region).await {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(
                target: "aws_env.metrics",
                region = %settings.region,
                error = %e,
                "Metrics enabled but configuration failed to load, using inert writer"
            );
            None
        }
    }
}

/// Activate the metrics capability.
///
/// Never fails: any error degrades to [`MetricsWriter::Inert`].
pub async fn activate_metrics(
    settings: &MetricsSettings,
    source: &dyn ConfigSource,
) -> MetricsWriter {
    let Some(config) = resolve_metrics_config(settings, source).await else {
        return MetricsWriter::Inert;
    };

    match TimestreamWriter::connect(&config).await {
        Ok(writer) => {
            tracing::info!(
                target: "aws_env.metrics",
                region = %writer.region(),
                database = METRICS_DATABASE,
                table = METRICS_TABLE,
                "Metrics emission enabled for this suite"
            );
            MetricsWriter::Active(writer)
        }
        Err(e) => {
            tracing::warn!(
                target: "aws_env.metrics",
                region = %config.region(),
                error = %e,
                "Metrics enabled but Timestream is unreachable, using inert writer"
            );
            MetricsWriter::Inert
        }
    }
}

/// Dimensions attached to every metric of the run.
pub fn run_dimensions(settings: &MetricsSettings) -> BTreeMap<String, String> {
    let mut dimensions = BTreeMap::new();
    if let Some(git_ref) = &settings.git_ref {
        dimensions.insert(GIT_REF_DIMENSION.to_string(), git_ref.clone());
    }
    if let Some(run_id) = &settings.run_id {
        dimensions.insert(RUN_ID_DIMENSION.to_string(), run_id.clone());
    }
    dimensions
}
