//! Logging setup.
//!
//! The core logs through `tracing`; the host app calls [`init_logging`]
//! once at startup (repeat calls are harmless) to route events to stdout,
//! where the platform log collector picks them up.

use tracing_subscriber::EnvFilter;

/// Installs a global fmt subscriber filtered by `filter`.
///
/// Invalid filter directives fall back to `info`. Returns `false` if a
/// global subscriber was already installed.
pub fn init_logging(filter: &str) -> bool {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
