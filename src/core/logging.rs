//! Tracing setup
//!
//! One fmt subscriber per process, filtered by `RUST_LOG` when set and by the
//! configured default otherwise. Work that runs before the configured filter
//! is known (loading the settings that hold it) goes through
//! [`with_bootstrap_logging`].

use tracing_subscriber::EnvFilter;

/// Default filter when neither `RUST_LOG` nor settings provide one
pub const DEFAULT_LOG_FILTER: &str = "info,xfchess_lessons=debug";

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global tracing subscriber
///
/// Safe to call more than once; later calls are ignored (tests and the CLI
/// may both try to initialise logging).
pub fn init_tracing(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_target(false)
        .try_init();
}

/// Run `f` with a temporary subscriber using [`DEFAULT_LOG_FILTER`]
pub fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter(DEFAULT_LOG_FILTER))
        .with_target(false)
        .finish();
    tracing::subscriber::with_default(bootstrap, f)
}
