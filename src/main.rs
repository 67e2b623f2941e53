use clap::{Arg, Command};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use treesync::client::SyncClient;
use treesync::config::Config;
use treesync::logging;
use treesync::scan;
use treesync::server::Server;

/// The client refuses to start against a path that is not an existing
/// directory; everything downstream assumes a scannable root.
fn working_dir(dir: &str) -> Result<PathBuf, Box<dyn Error>> {
	let root = PathBuf::from(dir);
	let meta = std::fs::metadata(&root).map_err(|_| format!("path not found: {}", dir))?;
	if !meta.is_dir() {
		return Err(format!("path is not a directory: {}", dir).into());
	}
	Ok(root)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	logging::init_tracing();

	let matches = Command::new("treesync")
		.version("0.1.0")
		.about("Keeps directory trees mirrored against a central server")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.help("Configuration file"),
		)
		.subcommand(
			Command::new("serve")
				.about("Run the server")
				.arg(Arg::new("dir").required(true))
				.arg(Arg::new("listen").long("listen").value_name("ADDR").help("Bind address")),
		)
		.subcommand(
			Command::new("sync")
				.about("Mirror a working directory against the server")
				.arg(Arg::new("dir").required(true))
				.arg(
					Arg::new("server")
						.long("server")
						.value_name("ADDR")
						.help("Server address"),
				)
				.arg(
					Arg::new("interval")
						.long("interval")
						.value_name("SECS")
						.help("Seconds between poll cycles"),
				),
		)
		.subcommand(
			Command::new("scan")
				.about("Print the scanner listing for a directory")
				.arg(Arg::new("dir").required(true)),
		)
		.get_matches();

	let config_path = matches.get_one::<String>("config").map(PathBuf::from);
	let mut config = Config::load(config_path.as_deref())?;

	if let Some(matches) = matches.subcommand_matches("serve") {
		let dir =
			matches.get_one::<String>("dir").ok_or("serve: directory argument required")?;
		if let Some(addr) = matches.get_one::<String>("listen") {
			config.listen_addr = addr.clone();
		}
		let server = Arc::new(Server::new(dir.as_str())?);
		server.run(&config.listen_addr).await?;
	} else if let Some(matches) = matches.subcommand_matches("sync") {
		let dir = matches.get_one::<String>("dir").ok_or("sync: directory argument required")?;
		let root = working_dir(dir)?;
		if let Some(addr) = matches.get_one::<String>("server") {
			config.server_addr = addr.clone();
		}
		if let Some(secs) = matches.get_one::<String>("interval") {
			config.set_poll_interval(secs.parse()?)?;
		}
		let mut client =
			SyncClient::connect(&config.server_addr, root, config.poll_interval).await?;
		client.run().await?;
	} else if let Some(matches) = matches.subcommand_matches("scan") {
		let dir = matches.get_one::<String>("dir").ok_or("scan: directory argument required")?;
		for entry in scan::scan_tree(Path::new(dir))? {
			println!("{}", entry.to_line());
		}
	}

	Ok(())
}

// vim: ts=4
