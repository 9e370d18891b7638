//! Tracing initialization.
//!
//! Logs are filtered through the `RUST_LOG` environment variable (default
//! `info`) and written to stderr: with the stdio transport, stdout carries
//! the JSON-RPC stream and must stay clean.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber.
///
/// # Panics
/// Panics if a global subscriber has already been set.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

/// Like [`init_tracing`], but returns an error instead of panicking when a
/// subscriber is already installed. Useful in tests.
pub fn try_init_tracing() -> Result<(), ()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_init_tracing_does_not_panic() {
        // May succeed or fail depending on test order, but must not panic
        let _ = try_init_tracing();
        let _ = try_init_tracing();
    }
}
