//! Tracing subscriber setup.
//!
//! Logs go to stderr so the JSON lines on stdout stay machine-readable.

use std::io::{IsTerminal, stderr};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber. Must be called once.
///
/// `RUST_LOG` wins when it parses; otherwise `verbose` picks the level for the
/// folio crates and everything else stays at `warn`.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose));

    let layer = fmt::layer()
        .with_writer(stderr)
        .with_ansi(stderr().is_terminal())
        .with_target(false)
        .without_time()
        .compact();

    tracing_subscriber::registry().with(filter).with(layer).init();
}

/// Filter used when `RUST_LOG` is unset or invalid.
fn default_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    EnvFilter::new(format!(
        "warn,folio={level},folio_index={level},folio_query={level},folio_config={level}"
    ))
}
