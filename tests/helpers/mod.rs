//! Shared test helpers.

pub mod archive_helpers;
pub mod model_fixtures;

pub use archive_helpers::*;
pub use model_fixtures::*;
pub use transport::FakeTransport;

/// Route `tracing` output through the test harness. `RUST_LOG` filters it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
