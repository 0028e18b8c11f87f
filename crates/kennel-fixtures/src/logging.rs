//! Test logging utilities.
//!
//! The crate logs through `tracing`; with its `log` feature the events reach
//! whatever `log` backend the test binary installs.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize logging for tests (call once)
///
/// Installs `env_logger` in test mode so output is captured per test and
/// filtered by `RUST_LOG`. Later calls are no-ops.
///
/// # Examples
///
/// ```
/// use kennel_fixtures::logging::init_test_logging;
///
/// init_test_logging();
/// init_test_logging();
/// ```
pub fn init_test_logging() {
	INIT.call_once(|| {
		let _ = env_logger::builder().is_test(true).try_init();
	});
}
