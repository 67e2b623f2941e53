//! Server: accept loop and per-connection command dispatcher
//!
//! One independent worker per accepted connection. Workers share nothing
//! except the injected `Registry`; every file operation goes under the
//! configured root directory. The dispatcher is a small state machine:
//! await a verb/filename pair, run the matching operation, repeat until
//! the transport reports a disconnect.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;

use crate::error::{ProtocolError, SyncError};
use crate::logging::*;
use crate::registry::{RegisteredClient, Registry};
use crate::scan;
use crate::types::{ChangeVerb, PendingChange};
use crate::util;
use crate::wire::{verb, PayloadError, Wire};

pub struct Server {
	root: PathBuf,
	registry: Arc<Registry>,
}

impl Server {
	/// Create a server rooted at `root`. The directory is created if
	/// absent; failure here is fatal at startup.
	pub fn new(root: impl Into<PathBuf>) -> Result<Server, SyncError> {
		let root = root.into();
		std::fs::create_dir_all(&root)?;
		Ok(Server { root, registry: Arc::new(Registry::new()) })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn registry(&self) -> &Arc<Registry> {
		&self.registry
	}

	/// Bind `addr` and serve until the process ends.
	pub async fn run(self: Arc<Server>, addr: &str) -> Result<(), SyncError> {
		let listener = TcpListener::bind(addr).await?;
		info!("listening on {}", listener.local_addr()?);
		self.run_on(listener).await
	}

	/// Accept connections from an already-bound listener, spawning one
	/// dispatcher task per client.
	pub async fn run_on(self: Arc<Server>, listener: TcpListener) -> Result<(), SyncError> {
		loop {
			let (stream, peer) = listener.accept().await?;
			let server = Arc::clone(&self);
			tokio::spawn(async move {
				server.serve_connection(stream, &peer.to_string()).await;
			});
		}
	}

	/// Register the connection, dispatch commands in arrival order until
	/// the transport fails, then deregister. Generic over the stream so
	/// tests can drive a dispatcher over an in-memory pipe.
	pub async fn serve_connection<S>(&self, stream: S, peer: &str)
	where
		S: AsyncRead + AsyncWrite + Unpin,
	{
		let client = self.registry.register().await;
		info!("client {} connected ({})", client.id, peer);
		let mut wire = Wire::new(stream);

		loop {
			let (command, filename) = match wire.recv_command().await {
				Ok(pair) => pair,
				Err(err) => {
					if err.is_disconnect() {
						info!("client {} disconnected", client.id);
					} else {
						warn!("client {}: {}", client.id, err);
					}
					break;
				}
			};
			debug!("client {}: {} {}", client.id, command, filename);

			let result = match command.as_str() {
				verb::LIST => self.handle_list(&mut wire).await,
				verb::STACKED_CHANGES => self.handle_stacked_changes(&mut wire, &client).await,
				verb::UPLOAD => self.handle_upload(&mut wire, &client, &filename).await,
				verb::DOWNLOAD => self.handle_download(&mut wire, &client, &filename).await,
				verb::CREATE_FOLDER => self.handle_create_folder(&client, &filename).await,
				verb::DELETE => self.handle_delete(&client, &filename).await,
				verb::EXISTS => self.handle_exists(&mut wire, &filename).await,
				other => Err(ProtocolError::UnknownVerb { verb: other.to_string() }.into()),
			};

			// Per-item trouble is already swallowed inside the handlers;
			// whatever reaches this point ends the session.
			if let Err(err) = result {
				if err.is_disconnect() {
					info!("client {} disconnected", client.id);
				} else {
					warn!("client {}: {} failed: {}", client.id, command, err);
				}
				break;
			}
		}

		self.registry.remove(client.id).await;
	}

	/// Stream the full listing of the server root, then the end sentinel.
	async fn handle_list<S>(&self, wire: &mut Wire<S>) -> Result<(), SyncError>
	where
		S: AsyncRead + AsyncWrite + Unpin,
	{
		let entries = scan::scan_tree(&self.root)?;
		for entry in &entries {
			wire.send_str(&entry.to_line()).await?;
		}
		wire.send_str(verb::LIST_END).await?;
		debug!("listed {} entries", entries.len());
		Ok(())
	}

	/// Stream and atomically clear this client's pending changes.
	async fn handle_stacked_changes<S>(
		&self,
		wire: &mut Wire<S>,
		client: &RegisteredClient,
	) -> Result<(), SyncError>
	where
		S: AsyncRead + AsyncWrite + Unpin,
	{
		let changes = client.drain_changes().await;
		for change in &changes {
			wire.send_str(&change.to_line()).await?;
		}
		wire.send_str(verb::STACKED_CHANGES_END).await?;
		Ok(())
	}

	/// Receive a length-prefixed file body into the server tree, then fan
	/// a DOWNLOAD notice out to every other client. A write failure
	/// mid-transfer deletes the partial file and keeps the connection; a
	/// stream failure deletes it and ends the session.
	async fn handle_upload<S>(
		&self,
		wire: &mut Wire<S>,
		client: &RegisteredClient,
		filename: &str,
	) -> Result<(), SyncError>
	where
		S: AsyncRead + AsyncWrite + Unpin,
	{
		let path = util::join_under_root(&self.root, filename)?;

		// Uploads and folder notices may arrive in either order across
		// clients, so the parent may not exist yet.
		if let Some(parent) = path.parent() {
			if let Err(err) = fs::create_dir_all(parent).await {
				warn!("upload {}: cannot create parent: {}", filename, err);
				wire.recv_payload(&mut tokio::io::sink()).await?;
				return Ok(());
			}
		}

		let mut file = match fs::File::create(&path).await {
			Ok(file) => file,
			Err(err) => {
				warn!("upload {}: cannot create file: {}", filename, err);
				wire.recv_payload(&mut tokio::io::sink()).await?;
				return Ok(());
			}
		};

		match wire.recv_payload(&mut file).await {
			Ok(len) => {
				debug!("client {} uploaded {} ({} bytes)", client.id, filename, len);
				self.registry
					.broadcast(client.id, PendingChange::new(ChangeVerb::Download, filename))
					.await;
				Ok(())
			}
			Err(PayloadError::Sink(err)) => {
				drop(file);
				warn!("upload {} failed mid-write: {}", filename, err);
				self.discard_partial(&path).await;
				Ok(())
			}
			Err(PayloadError::Stream(err)) => {
				drop(file);
				self.discard_partial(&path).await;
				Err(err.into())
			}
		}
	}

	/// Stream a server file to the client, length-prefixed. The client's
	/// queue is held for the whole transfer so no other worker touches
	/// this connection's state mid-stream.
	async fn handle_download<S>(
		&self,
		wire: &mut Wire<S>,
		client: &RegisteredClient,
		filename: &str,
	) -> Result<(), SyncError>
	where
		S: AsyncRead + AsyncWrite + Unpin,
	{
		let _busy = client.begin_transfer().await;
		let path = util::join_under_root(&self.root, filename)?;
		let mut file = fs::File::open(&path).await?;
		let len = file.metadata().await?.len();
		wire.send_payload(len, &mut file).await?;
		debug!("client {} downloaded {} ({} bytes)", client.id, filename, len);
		Ok(())
	}

	async fn handle_create_folder(
		&self,
		client: &RegisteredClient,
		filename: &str,
	) -> Result<(), SyncError> {
		let path = util::join_under_root(&self.root, filename)?;
		if let Err(err) = fs::create_dir_all(&path).await {
			warn!("cannot create folder {}: {}", filename, err);
			return Ok(());
		}
		debug!("client {} created folder {}", client.id, filename);
		self.registry
			.broadcast(client.id, PendingChange::new(ChangeVerb::CreateFolder, filename))
			.await;
		Ok(())
	}

	async fn handle_delete(
		&self,
		client: &RegisteredClient,
		filename: &str,
	) -> Result<(), SyncError> {
		let path = util::join_under_root(&self.root, filename)?;
		if let Err(err) = util::remove_path(&path).await {
			warn!("cannot delete {}: {}", filename, err);
			return Ok(());
		}
		debug!("client {} deleted {}", client.id, filename);
		self.registry
			.broadcast(client.id, PendingChange::new(ChangeVerb::Delete, filename))
			.await;
		Ok(())
	}

	async fn handle_exists<S>(&self, wire: &mut Wire<S>, filename: &str) -> Result<(), SyncError>
	where
		S: AsyncRead + AsyncWrite + Unpin,
	{
		let path = util::join_under_root(&self.root, filename)?;
		let exists = fs::metadata(&path).await.is_ok();
		wire.send_bool(exists).await
	}

	/// Deletion failure of a partial upload is reported, never escalated.
	async fn discard_partial(&self, path: &Path) {
		if let Err(err) = fs::remove_file(path).await {
			if err.kind() != std::io::ErrorKind::NotFound {
				warn!("cannot remove partial file {}: {}", path.display(), err);
			}
		}
	}
}

// vim: ts=4
