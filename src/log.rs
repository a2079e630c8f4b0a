//! Logging setup for the taskweave binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is up to
//! the application. Debug mode can be enabled with the `--debug` flag or the
//! `TASKWEAVE_DEBUG=1` env var, and `TASKWEAVE_LOG` takes a full
//! `EnvFilter` directive that overrides both.

use tracing_subscriber::EnvFilter;

pub const DEBUG_ENV: &str = "TASKWEAVE_DEBUG";
pub const FILTER_ENV: &str = "TASKWEAVE_LOG";

/// Initialize logging at the default level.
pub fn init() {
    init_with_debug(false);
}

/// Initialize logging to stderr with explicit debug mode setting.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_with_debug(debug: bool) {
    let filter = filter(debug || env_debug(), std::env::var(FILTER_ENV).ok().as_deref());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn env_debug() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "taskweave=debug"
    } else {
        "taskweave=warn"
    }
}

fn filter(debug: bool, directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directive(debug)))
}
