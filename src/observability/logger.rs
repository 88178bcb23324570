use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over the configured directive; a bad directive falls back to `warn`.
pub fn build_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs a compact stderr subscriber. Later calls are no-ops.
pub fn init_logging(configured: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(configured))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
