//! Tracing setup for test binaries.
//!
//! Recorders log every registered expectation and recorded call at `debug`
//! and test-setup failures at `error`. Installing the subscriber below makes
//! those events visible through libtest's captured output.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "sql_test_doubles=debug";

/// Installs a fmt subscriber that writes through the test harness.
///
/// Safe to call from every test: only the first call installs a subscriber.
/// Returns `true` if this call installed it.
pub fn init_test_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(false)
        .try_init()
        .is_ok()
}

/// Same as [`init_test_tracing`] with JSON lines, for tooling that parses
/// test logs.
pub fn init_test_tracing_json() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_test_tracing();
        assert!(!init_test_tracing());
        assert!(!init_test_tracing_json());
    }
}
