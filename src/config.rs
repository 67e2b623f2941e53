//! Runtime configuration
//!
//! Follows a priority chain:
//! 1. Built-in defaults (`Config::default()`)
//! 2. Optional TOML config file
//! 3. Environment variables (`TREESYNC_*` prefix)
//! 4. CLI flags (applied by the entry point, highest priority)

use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::error::SyncError;
use crate::types::{DEFAULT_PORT, POLL_INTERVAL};

/// Settings shared by the server and client entry points.
#[derive(Debug, Clone)]
pub struct Config {
	/// Address the server binds
	pub listen_addr: String,

	/// Address the client connects to
	pub server_addr: String,

	/// Time between client poll cycles; also the width of the "recently
	/// modified" re-upload window
	pub poll_interval: Duration,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
			server_addr: format!("127.0.0.1:{}", DEFAULT_PORT),
			poll_interval: POLL_INTERVAL,
		}
	}
}

/// On-disk representation; every field optional so partial files work.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConfigFile {
	listen_addr: Option<String>,
	server_addr: Option<String>,
	poll_interval_secs: Option<u64>,
}

impl Config {
	/// Resolve configuration from defaults, then the given file (if any),
	/// then the environment.
	pub fn load(path: Option<&Path>) -> Result<Config, SyncError> {
		let mut config = Config::default();

		if let Some(path) = path {
			let raw = std::fs::read_to_string(path).map_err(|err| SyncError::InvalidConfig {
				message: format!("cannot read {}: {}", path.display(), err),
			})?;
			let file: ConfigFile =
				toml::from_str(&raw).map_err(|err| SyncError::InvalidConfig {
					message: format!("cannot parse {}: {}", path.display(), err),
				})?;
			config.apply_file(file)?;
		}

		config.apply_env()?;
		Ok(config)
	}

	fn apply_file(&mut self, file: ConfigFile) -> Result<(), SyncError> {
		if let Some(addr) = file.listen_addr {
			self.listen_addr = addr;
		}
		if let Some(addr) = file.server_addr {
			self.server_addr = addr;
		}
		if let Some(secs) = file.poll_interval_secs {
			self.set_poll_interval(secs)?;
		}
		Ok(())
	}

	fn apply_env(&mut self) -> Result<(), SyncError> {
		if let Ok(addr) = env::var("TREESYNC_LISTEN_ADDR") {
			self.listen_addr = addr;
		}
		if let Ok(addr) = env::var("TREESYNC_SERVER_ADDR") {
			self.server_addr = addr;
		}
		if let Ok(secs) = env::var("TREESYNC_POLL_INTERVAL") {
			let secs: u64 = secs.parse().map_err(|_| SyncError::InvalidConfig {
				message: format!("TREESYNC_POLL_INTERVAL is not a number: {}", secs),
			})?;
			self.set_poll_interval(secs)?;
		}
		Ok(())
	}

	pub fn set_poll_interval(&mut self, secs: u64) -> Result<(), SyncError> {
		if secs == 0 {
			return Err(SyncError::InvalidConfig {
				message: "poll interval must be at least one second".to_string(),
			});
		}
		self.poll_interval = Duration::from_secs(secs);
		Ok(())
	}
}

// vim: ts=4
