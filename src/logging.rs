//! Structured logging setup using `tracing-subscriber`.
//!
//! All diagnostics go to stderr. `RUST_LOG` takes precedence; otherwise the
//! level follows the `VERBOSE` setting. Colours are only used on a terminal,
//! so journald and piped output stay plain.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

/// Filter directive used when `RUST_LOG` is not set.
pub fn filter_directive(verbose: bool) -> &'static str {
    if verbose {
        "info,exabgp_notify=debug"
    } else {
        "info"
    }
}

/// Initialise stderr logging. Call once, after configuration is resolved.
pub fn init(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}
