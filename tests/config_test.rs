//! Configuration loading tests

use std::fs;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

use treesync::config::Config;

// Loading reads process-wide environment variables, so tests touching it
// take this lock to keep the environment test from racing the others.
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn defaults_cover_addresses() {
	let config = Config::default();
	assert_eq!(config.listen_addr, "0.0.0.0:5656");
	assert_eq!(config.server_addr, "127.0.0.1:5656");
	assert_eq!(config.poll_interval, Duration::from_secs(5));
}

#[test]
fn a_partial_file_overrides_only_what_it_names() {
	let _env = ENV_LOCK.lock().unwrap();
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("treesync.toml");
	fs::write(&path, "listenAddr = \"10.0.0.1:9000\"\n").unwrap();

	let config = Config::load(Some(path.as_path())).unwrap();
	assert_eq!(config.listen_addr, "10.0.0.1:9000");
	assert_eq!(config.server_addr, "127.0.0.1:5656");
}

#[test]
fn a_full_file_sets_everything() {
	let _env = ENV_LOCK.lock().unwrap();
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("treesync.toml");
	fs::write(
		&path,
		"listenAddr = \"0.0.0.0:7777\"\nserverAddr = \"sync.host:7777\"\npollIntervalSecs = 30\n",
	)
	.unwrap();

	let config = Config::load(Some(path.as_path())).unwrap();
	assert_eq!(config.listen_addr, "0.0.0.0:7777");
	assert_eq!(config.server_addr, "sync.host:7777");
	assert_eq!(config.poll_interval, Duration::from_secs(30));
}

#[test]
fn a_zero_poll_interval_is_rejected() {
	let _env = ENV_LOCK.lock().unwrap();
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("treesync.toml");
	fs::write(&path, "pollIntervalSecs = 0\n").unwrap();
	assert!(Config::load(Some(path.as_path())).is_err());
}

#[test]
fn an_unreadable_file_is_an_error() {
	let _env = ENV_LOCK.lock().unwrap();
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("missing.toml");
	assert!(Config::load(Some(path.as_path())).is_err());
}

#[test]
fn garbage_toml_is_an_error() {
	let _env = ENV_LOCK.lock().unwrap();
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("treesync.toml");
	fs::write(&path, "this is not toml [").unwrap();
	assert!(Config::load(Some(path.as_path())).is_err());
}

#[test]
fn environment_beats_the_file() {
	let _env = ENV_LOCK.lock().unwrap();
	let dir = TempDir::new().unwrap();
	let path = dir.path().join("treesync.toml");
	fs::write(&path, "pollIntervalSecs = 30\n").unwrap();

	std::env::set_var("TREESYNC_POLL_INTERVAL", "2");
	let config = Config::load(Some(path.as_path()));
	std::env::remove_var("TREESYNC_POLL_INTERVAL");

	assert_eq!(config.unwrap().poll_interval, Duration::from_secs(2));
}

// vim: ts=4
