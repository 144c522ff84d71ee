//! Tracing setup for evaluators embedding the registry.
//!
//! The library only emits `tracing` events. Hosts that have no subscriber
//! of their own can install the default one here.

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"info"` or `"triple_tms=debug"`).
///
/// Fails if a global subscriber is already installed.
pub fn init(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .finish()
        .try_init()
}
