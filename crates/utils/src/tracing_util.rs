//! Helpers related to tracing, used by main entrypoints

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with the default configuration; we log to stderr
/// and parse the standard `RUST_LOG` environment variable, defaulting
/// to printing warnings and errors.
pub fn initialize_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time();
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();
}
