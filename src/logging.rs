//! Structured logging setup.
//!
//! The library only emits `tracing` events; hosts call [`init`] once (or
//! install their own subscriber) to see them.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Settings;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_filter(settings: &Settings) -> &'static str {
    if settings.debug { "litkb=debug" } else { "litkb=info" }
}

/// Install a stderr subscriber honoring `RUST_LOG`, falling back to
/// [`default_filter`].
///
/// Returns `false` when another global subscriber is already installed.
pub fn init(settings: &Settings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(settings)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .is_ok()
}
