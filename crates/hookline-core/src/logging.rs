#![forbid(unsafe_code)]

//! Log bootstrap for binaries and harnesses embedding the dispatcher.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! embedding program's call. These helpers install a global
//! `tracing-subscriber` formatter whose filter comes from `RUST_LOG`, falling
//! back to `default_filter` (e.g. `"hookline_core=debug"`).

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a human-readable formatter on stderr.
///
/// Fails if a global subscriber is already set.
///
/// ```
/// use hookline_core::logging;
///
/// logging::init("hookline_core=debug").expect("no subscriber installed yet");
/// assert!(logging::init_json("hookline_core=debug").is_err());
/// ```
pub fn init(default_filter: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
}

/// Install a JSON-lines formatter on stderr.
///
/// Fails if a global subscriber is already set.
pub fn init_json(default_filter: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .try_init()
}
