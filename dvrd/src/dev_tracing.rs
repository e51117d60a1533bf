/// Initialize the tracing subscriber from `RUST_LOG`, defaulting to `info`
/// when the variable is unset.
///
/// A no-op if a global subscriber is already installed (tests calling this
/// more than once).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
