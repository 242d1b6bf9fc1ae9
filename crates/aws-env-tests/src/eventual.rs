//! Eventual consistency helpers for timing-dependent tests.
//!
//! Provisioning, interruption handling and metric ingestion all settle
//! asynchronously on AWS. Suites poll with exponential backoff until the
//! condition holds or the category's SLA runs out.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};

/// Categories of eventual consistency with documented SLAs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyCategory {
    /// EC2 instance launch through node registration (10min)
    NodeLaunch,

    /// Node drain and instance termination (10min)
    NodeTermination,

    /// Interruption event delivered from SQS and acted on (2min)
    InterruptionDelivery,

    /// Timestream write visible to queries (1min)
    MetricsIngest,
}

impl ConsistencyCategory {
    /// Get the maximum timeout for this consistency category.
    pub fn timeout(&self) -> Duration {
        match self {
            ConsistencyCategory::NodeLaunch => Duration::from_secs(600),
            ConsistencyCategory::NodeTermination => Duration::from_secs(600),
            ConsistencyCategory::InterruptionDelivery => Duration::from_secs(120),
            ConsistencyCategory::MetricsIngest => Duration::from_secs(60),
        }
    }

    /// Get the initial retry delay for exponential backoff.
    fn initial_delay(&self) -> Duration {
        match self {
            ConsistencyCategory::NodeLaunch | ConsistencyCategory::NodeTermination => {
                Duration::from_secs(2)
            }
            ConsistencyCategory::InterruptionDelivery | ConsistencyCategory::MetricsIngest => {
                Duration::from_millis(500)
            }
        }
    }

    /// Upper bound for a single backoff step.
    fn max_delay(&self) -> Duration {
        Duration::from_secs(30)
    }
}

/// The condition did not hold before the category's timeout.
#[derive(Debug, Error)]
#[error("Condition not met within {timeout:?} after {attempts} attempts (category: {category:?})")]
pub struct EventualTimeout {
    pub category: ConsistencyCategory,
    pub timeout: Duration,
    pub attempts: u32,
}

/// Wait until `condition` returns true, within the category's timeout.
///
/// Backoff doubles from the category's initial delay, capped at 30s per step
/// and at the time remaining.
///
/// # Example
///
/// ```no_run
/// use aws_env_tests::eventual::{assert_eventually, ConsistencyCategory};
///
/// # async fn node_count() -> usize { 0 }
/// # async fn example() {
/// assert_eventually(ConsistencyCategory::NodeLaunch, || async {
///     node_count().await >= 3
/// })
/// .await
/// .expect("nodes should launch");
/// # }
/// ```
pub async fn assert_eventually<F, Fut>(
    category: ConsistencyCategory,
    mut condition: F,
) -> Result<(), EventualTimeout>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let timeout = category.timeout();
    let deadline = Instant::now() + timeout;
    let mut delay = category.initial_delay();
    let mut attempts = 0;

    loop {
        attempts += 1;
        if condition().await {
            return Ok(());
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(EventualTimeout {
                category,
                timeout,
                attempts,
            });
        }

        sleep(delay.min(remaining)).await;
        delay = (delay * 2).min(category.max_delay());
    }
}
