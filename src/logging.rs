//! Logging prelude module for convenient access to tracing macros.
//!
//! All user-visible output from the engine is advisory logging; there is no
//! error-code surface beyond what the CLI layer reports at startup.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("uploaded {}", path);
//! warn!("skipping unreadable file");
//! ```

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// Logs at INFO level and above by default. Control the level with the
/// `RUST_LOG` environment variable:
///
/// ```bash
/// RUST_LOG=debug treesync serve ./data
/// RUST_LOG=treesync::server=debug,treesync::client=trace treesync sync ./work
/// ```
pub fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();
}
