//! Diagnostic tracing for booster runs.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. The per-boost
//! lines and summary table printed by the CLI go to stdout and are not
//! affected by it.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn`, or `booster=info` with `verbose`.
///
/// # Example
/// ```bash
/// RUST_LOG=booster=debug booster run
/// ```
pub fn init(verbose: bool) {
    let fallback = if verbose { "warn,booster=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
