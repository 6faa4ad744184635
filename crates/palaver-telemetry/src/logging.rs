//! `tracing` subscriber initialisation.

use tracing_subscriber::EnvFilter;

/// Resolve the event filter: `RUST_LOG` wins, then `level`, then `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global tracing subscriber on stderr.
///
/// Compact human-readable lines by default, one JSON object per line when
/// `json` is set. Subsequent calls are no-ops.
pub fn init_subscriber(level: &str, json: bool) {
    let filter = build_filter(level);

    // try_init is a no-op if a global subscriber is already set
    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    }
}
