use crate::config::LOG_VAR;
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber, logging to stderr.
///
/// The filter comes from `TIMETABLE_LOG`, then `RUST_LOG`, then `default`.
/// A second call is a no-op.
pub fn init_tracing(default: &str) {
    let filter = EnvFilter::try_from_env(LOG_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
