//! Tracing subscriber setup for binaries and demos.

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber honoring `RUST_LOG`, defaulting to
/// `info` when unset. Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
