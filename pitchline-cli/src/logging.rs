//! Structured logging setup.
//!
//! Log lines go to stderr so that stdout carries only the tuner readout.
//! The level comes from `RUST_LOG` (e.g. `RUST_LOG=pitchline_core=debug`),
//! defaulting to `info`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber. Later calls are ignored.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true),
    );

    // Ignore error if subscriber was already set
    let _ = tracing::subscriber::set_global_default(subscriber);
}
