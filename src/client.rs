//! Client: reconciliation engine and poll loop
//!
//! The client owns a single worker loop: connect, converge once against
//! the server's listing, then forever rescan the working tree, push local
//! changes, pull the stacked remote changes, sleep, repeat. The remembered
//! snapshot is touched by this loop alone; nothing here is shared.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::{ProtocolError, SyncError};
use crate::logging::*;
use crate::scan;
use crate::types::{ChangeVerb, FileEntry, FileKind, PendingChange};
use crate::util;
use crate::wire::{verb, PayloadError, Wire};

pub struct SyncClient<S> {
	wire: Wire<S>,
	root: PathBuf,
	/// Paths this client currently believes exist locally, kept sorted.
	snapshot: BTreeSet<String>,
	poll_interval: Duration,
}

impl SyncClient<TcpStream> {
	/// Connect to a server and take the initial snapshot of `root`.
	pub async fn connect(
		addr: &str,
		root: impl Into<PathBuf>,
		poll_interval: Duration,
	) -> Result<SyncClient<TcpStream>, SyncError> {
		let stream = TcpStream::connect(addr).await?;
		SyncClient::with_stream(stream, root, poll_interval)
	}
}

impl<S: AsyncRead + AsyncWrite + Unpin> SyncClient<S> {
	/// Build a client over an already-established stream.
	pub fn with_stream(
		stream: S,
		root: impl Into<PathBuf>,
		poll_interval: Duration,
	) -> Result<SyncClient<S>, SyncError> {
		let root = root.into();
		let snapshot = scan::scan_tree(&root)?.into_iter().map(|e| e.path).collect();
		Ok(SyncClient { wire: Wire::new(stream), root, snapshot, poll_interval })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn snapshot(&self) -> &BTreeSet<String> {
		&self.snapshot
	}

	/// Run forever: one full reconciliation, then a diff cycle every poll
	/// interval. Returns only when the connection fails.
	pub async fn run(&mut self) -> Result<(), SyncError> {
		self.initial_sync().await?;
		loop {
			self.poll_cycle().await?;
			tokio::time::sleep(self.poll_interval).await;
		}
	}

	/// One-time convergence to the union of both trees: fetch what only
	/// the server has, announce what only this client has. Neither side's
	/// pre-existing content is deleted on first contact.
	pub async fn initial_sync(&mut self) -> Result<(), SyncError> {
		let server_entries = self.request_list().await?;

		for entry in &server_entries {
			let local = util::join_under_root(&self.root, &entry.path)?;
			if local.exists() {
				continue;
			}
			match entry.kind {
				FileKind::File => {
					if self.download(&entry.path).await? {
						self.snapshot.insert(entry.path.clone());
					}
				}
				FileKind::Dir => {
					fs::create_dir_all(&local).await?;
					self.snapshot.insert(entry.path.clone());
				}
			}
		}

		let server_paths: HashSet<&str> =
			server_entries.iter().map(|e| e.path.as_str()).collect();
		let local_only: Vec<String> = self
			.snapshot
			.iter()
			.filter(|p| !server_paths.contains(p.as_str()))
			.cloned()
			.collect();

		for path in local_only {
			let local = util::join_under_root(&self.root, &path)?;
			if local.is_dir() {
				self.request_create_folder(&path).await?;
			} else {
				match self.upload(&path).await {
					Ok(()) => {}
					Err(err) if err.is_not_found() => {
						debug!("skipping vanished file {}", path);
					}
					Err(err) => return Err(err),
				}
			}
		}

		info!("initial sync complete, {} paths tracked", self.snapshot.len());
		Ok(())
	}

	/// One incremental diff cycle: push local deletions and creations,
	/// re-upload recently modified files, commit the staged snapshot
	/// edits, then pull and apply the server's stacked changes.
	pub async fn poll_cycle(&mut self) -> Result<(), SyncError> {
		let current_entries = scan::scan_tree(&self.root)?;
		let current_paths: BTreeSet<&str> =
			current_entries.iter().map(|e| e.path.as_str()).collect();

		// Deletions first, in descending path order, so a directory's
		// notice trails its contents' for ordinary name schemes. The
		// server-side delete is idempotent either way.
		let deleted: Vec<String> = self
			.snapshot
			.iter()
			.rev()
			.filter(|p| !current_paths.contains(p.as_str()))
			.cloned()
			.collect();
		for path in &deleted {
			self.request_delete(path).await?;
			info!("deleted {} on server", path);
		}

		let mut added: Vec<String> = Vec::new();
		for entry in &current_entries {
			if !self.snapshot.contains(&entry.path) {
				match entry.kind {
					FileKind::Dir => {
						self.request_create_folder(&entry.path).await?;
					}
					FileKind::File => match self.upload(&entry.path).await {
						Ok(()) => {}
						Err(err) if err.is_not_found() => {
							debug!("skipping vanished file {}", entry.path);
							continue;
						}
						Err(err) => return Err(err),
					},
				}
				added.push(entry.path.clone());
			} else if entry.kind == FileKind::File && self.recently_modified(&entry.path) {
				match self.upload(&entry.path).await {
					Ok(()) => {}
					Err(err) if err.is_not_found() => {
						debug!("skipping vanished file {}", entry.path);
					}
					Err(err) => return Err(err),
				}
			}
		}

		for path in deleted {
			self.snapshot.remove(&path);
		}
		for path in added {
			self.snapshot.insert(path);
		}

		let changes = self.request_stacked_changes().await?;
		if !changes.is_empty() {
			info!("applying {} stacked changes", changes.len());
		}
		for change in changes {
			self.apply_change(change).await?;
		}

		Ok(())
	}

	/// The "changed recently" heuristic: a file whose mtime falls inside
	/// the last poll interval gets re-uploaded. Cheap, and known to miss a
	/// second edit landing in the same interval; a content hash would be a
	/// strengthening, not a behavior change.
	fn recently_modified(&self, path: &str) -> bool {
		let local = match util::join_under_root(&self.root, path) {
			Ok(local) => local,
			Err(_) => return false,
		};
		match std::fs::metadata(&local).and_then(|m| m.modified()) {
			Ok(mtime) => match mtime.elapsed() {
				Ok(age) => age <= self.poll_interval,
				// mtime in the future counts as recent
				Err(_) => true,
			},
			Err(_) => false,
		}
	}

	/// Apply one queued remote change and keep the snapshot in line with
	/// what now exists locally. Local filesystem trouble is logged and
	/// skipped; the rest of the batch still applies.
	async fn apply_change(&mut self, change: PendingChange) -> Result<(), SyncError> {
		debug!("applying {}", change.to_line());
		match change.verb {
			ChangeVerb::Download => {
				if self.download(&change.path).await? {
					info!("fetched {} from server", change.path);
					self.snapshot.insert(change.path);
				}
			}
			ChangeVerb::CreateFolder => {
				let local = util::join_under_root(&self.root, &change.path)?;
				if let Err(err) = fs::create_dir_all(&local).await {
					warn!("cannot create folder {}: {}", change.path, err);
					return Ok(());
				}
				self.snapshot.insert(change.path);
			}
			ChangeVerb::Delete => {
				let local = util::join_under_root(&self.root, &change.path)?;
				if let Err(err) = util::remove_path(&local).await {
					warn!("cannot delete {}: {}", change.path, err);
					return Ok(());
				}
				self.snapshot.remove(&change.path);
			}
		}
		Ok(())
	}

	/// Ask the server for its full listing.
	pub async fn request_list(&mut self) -> Result<Vec<FileEntry>, SyncError> {
		self.wire.send_command(verb::LIST, "").await?;
		let mut entries = Vec::new();
		loop {
			let line = self.wire.recv_str().await?;
			if line == verb::LIST_END {
				break;
			}
			match FileEntry::parse_line(&line) {
				Some(entry) => entries.push(entry),
				None => return Err(ProtocolError::MalformedEntry { line }.into()),
			}
		}
		Ok(entries)
	}

	/// Ask the server for the queued notifications of other clients'
	/// changes. The server clears the queue as it streams it.
	pub async fn request_stacked_changes(&mut self) -> Result<Vec<PendingChange>, SyncError> {
		self.wire.send_command(verb::STACKED_CHANGES, "").await?;
		let mut changes = Vec::new();
		loop {
			let line = self.wire.recv_str().await?;
			if line == verb::STACKED_CHANGES_END {
				break;
			}
			match PendingChange::parse_line(&line) {
				Some(change) => changes.push(change),
				None => return Err(ProtocolError::MalformedChange { line }.into()),
			}
		}
		Ok(changes)
	}

	/// Ask whether a path exists on the server.
	pub async fn request_exists(&mut self, path: &str) -> Result<bool, SyncError> {
		self.wire.send_command(verb::EXISTS, path).await?;
		self.wire.recv_bool().await
	}

	/// Push one local file to the server, length-prefixed. The file is
	/// opened before any frame goes out, so a vanished file skips cleanly
	/// without touching the wire.
	async fn upload(&mut self, path: &str) -> Result<(), SyncError> {
		let local = util::join_under_root(&self.root, path)?;
		let mut file = fs::File::open(&local).await?;
		let len = file.metadata().await?.len();
		self.wire.send_command(verb::UPLOAD, path).await?;
		self.wire.send_payload(len, &mut file).await?;
		info!("uploaded {} ({} bytes)", path, len);
		Ok(())
	}

	/// Fetch one file from the server into the working tree. Returns
	/// whether the file was actually stored: a local write failure is
	/// skipped per-item (the partial file is removed), while a stream
	/// failure is fatal to the session.
	async fn download(&mut self, path: &str) -> Result<bool, SyncError> {
		self.wire.send_command(verb::DOWNLOAD, path).await?;
		let local = util::join_under_root(&self.root, path)?;
		if let Some(parent) = local.parent() {
			if let Err(err) = fs::create_dir_all(parent).await {
				warn!("download {}: cannot create parent: {}", path, err);
				self.wire.recv_payload(&mut tokio::io::sink()).await?;
				return Ok(false);
			}
		}
		let mut file = match fs::File::create(&local).await {
			Ok(file) => file,
			Err(err) => {
				warn!("download {}: cannot create file: {}", path, err);
				self.wire.recv_payload(&mut tokio::io::sink()).await?;
				return Ok(false);
			}
		};
		match self.wire.recv_payload(&mut file).await {
			Ok(len) => {
				debug!("downloaded {} ({} bytes)", path, len);
				Ok(true)
			}
			Err(PayloadError::Sink(err)) => {
				drop(file);
				warn!("download {} failed mid-write: {}", path, err);
				if let Err(err) = fs::remove_file(&local).await {
					warn!("cannot remove partial file {}: {}", local.display(), err);
				}
				Ok(false)
			}
			Err(PayloadError::Stream(err)) => Err(err.into()),
		}
	}

	async fn request_create_folder(&mut self, path: &str) -> Result<(), SyncError> {
		self.wire.send_command(verb::CREATE_FOLDER, path).await?;
		info!("announced folder {}", path);
		Ok(())
	}

	async fn request_delete(&mut self, path: &str) -> Result<(), SyncError> {
		self.wire.send_command(verb::DELETE, path).await
	}
}

// vim: ts=4
