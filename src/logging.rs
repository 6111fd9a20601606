//! Opt-in tracing initialization.

use tracing_subscriber::EnvFilter;

/// Install a process-wide subscriber with the crate's default filter.
///
/// Respects `RUST_LOG`; without it, warnings from everywhere and info from
/// this crate. Embedding tools that configure their own subscriber should
/// skip this; calling it more than once leaves the first subscriber in
/// place.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,runmerge=info")),
        )
        .try_init();
}
