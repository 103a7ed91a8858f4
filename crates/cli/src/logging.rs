//! Tracing setup for the `storm` binary

use std::path::Path;
use storm_core::StormConfig;
use tracing_subscriber::EnvFilter;

/// Level used when neither `RUST_LOG`, `--verbose` nor the config set one
pub const DEFAULT_LEVEL: &str = "warn";

/// Filter directive: `--verbose` first, then the project's `logLevel`
pub fn filter_directive(verbose: bool, project_root: &Path) -> String {
    if verbose {
        return "debug".to_string();
    }
    StormConfig::load_from_root(project_root)
        .ok()
        .and_then(|config| config.log_level)
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// Install the global subscriber. `RUST_LOG` wins over everything else.
///
/// Logs go to stderr so worker output on stdout stays machine-readable.
pub fn init(verbose: bool, project_root: &Path) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose, project_root)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
