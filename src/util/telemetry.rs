//! Telemetry helpers for structured logging.

use tracing_subscriber::EnvFilter;

/// Install a default `RUST_LOG`-driven subscriber if none is set.
///
/// Applications are free to install their own subscriber instead; this is a
/// no-op once any global dispatcher exists.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Like [`init_tracing`], falling back to `directive` when `RUST_LOG` is unset
/// or unparsable.
pub fn init_tracing_with_default(directive: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
