//! Shared pieces for the Mirrorgate CLI binaries.

use tracing_subscriber::EnvFilter;

/// Initialize tracing for CLI usage: quiet by default, RUST_LOG overrides.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_target(false)
        .init();
}
