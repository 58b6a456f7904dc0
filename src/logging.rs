use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (for example `debug`).
pub const LOG_ENV_VAR: &str = "COMMAND_HELPER_LOG";

const DEFAULT_LOG_DIRECTIVE: &str = "warn";

/// Installs the stderr log subscriber.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
