use tracing_subscriber::{fmt, EnvFilter};

/// Logs to stderr so stdout stays machine-readable. `RUST_LOG` overrides the
/// default `warn` filter.
pub(crate) fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
