//! Logging initialization.
//!
//! Library code logs through `tracing` macros; the binary installs a
//! `tracing-subscriber` registry once at start-up. Output goes to stderr so
//! stdout stays free for `info --json` and similar data output.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{LogFormat, LoggingConfig};

/// Filter directive for the given settings. `verbose` raises anything
/// quieter than `debug` to `debug`.
pub fn default_directive(config: &LoggingConfig, verbose: bool) -> String {
    match config.level.as_str() {
        "trace" | "debug" => config.level.clone(),
        _ if verbose => "debug".to_string(),
        level => level.to_string(),
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, replaces the configured level. Calling this twice
/// is harmless; the second call leaves the first subscriber in place.
pub fn init(config: &LoggingConfig, verbose: bool, json_override: bool) {
    let directive = default_directive(config, verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let result = if json_override || config.format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}
