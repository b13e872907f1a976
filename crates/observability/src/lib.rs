//! Tracing and logging (shared setup).

/// Initialize process-wide logging with JSON output and the `RUST_LOG` filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(&LogConfig::default());
}

/// Initialize process-wide logging with an explicit configuration.
pub fn init_with(config: &LogConfig) {
    tracing::init(config);
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LogConfig, LogFormat};
