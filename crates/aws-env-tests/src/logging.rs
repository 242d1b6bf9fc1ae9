//! Tracing setup for test binaries.

use std::sync::Once;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "aws_env=debug,aws_env_tests=debug";

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per process.
///
/// Output is captured per test by the harness and shown only for failures.
/// Safe to call from every test; a subscriber installed elsewhere wins.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}
