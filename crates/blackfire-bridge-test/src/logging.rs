//! Log output for profiled test runs

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a fmt subscriber routed through the test writer.
///
/// Honors `RUST_LOG`, defaulting to `warn`. Safe to call from every test.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter)
        .try_init()
        .ok(); // Ignore error if already initialized
}
