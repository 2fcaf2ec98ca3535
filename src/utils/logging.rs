//! Logging utilities
//!
//! Provides logging setup and configuration.

use env_logger::Env;

/// Setup logging for the client.
///
/// `RUST_LOG` selects the level; without it only warnings and errors are
/// shown so log lines do not interleave with the shell output.
pub fn setup_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();
}
