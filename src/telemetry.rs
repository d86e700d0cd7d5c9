//! Log subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global `fmt` subscriber. `RUST_LOG` wins over `default_level`.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .try_init();
}
