//! Logging configuration for cohort-query.

use tracing_subscriber::EnvFilter;

/// Initializes logging to stderr.
///
/// Honors `RUST_LOG`; defaults to `info`. Results go to stdout, so diagnostics
/// must stay on stderr.
pub fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
