//! Shared fixtures for assetflow's integration tests.

pub mod builders;
pub mod fake_executor;
pub mod scripted_compiler;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

use assetflow::logging::LOG_ENV_VAR;

pub use builders::{ManifestBuilder, RegistryBuilder, UnitConfigBuilder};
pub use fake_executor::{finish, finished, FakeExecutor};
pub use scripted_compiler::ScriptedCompiler;

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Install a test-captured subscriber once per test binary.
///
/// The filter comes from `ASSETFLOW_LOG` (e.g. `ASSETFLOW_LOG=assetflow=debug`)
/// and defaults to `info`. Output only shows for failing tests unless the
/// harness runs with `--nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test step did not finish within {TEST_TIMEOUT:?}"),
    }
}
