//! Server-side client registry and change propagation queues
//!
//! The registry is the only state shared between per-connection workers.
//! The map itself sits behind one mutex that is never held across a
//! blocking network or file operation; each client's pending-change queue
//! has its own async mutex. A long outbound transfer holds the target
//! client's queue lock for its whole duration, so fan-out appends from
//! other workers line up behind the transfer instead of interleaving onto
//! an in-use connection.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::logging::*;
use crate::types::PendingChange;

/// One registered connection: its identifier plus the ordered list of
/// remote-change notifications waiting for its next poll.
///
/// Identifiers increase monotonically and are never reused within a server
/// run. The queue only ever holds changes that occurred while the client
/// was registered; whatever is still queued at disconnect is discarded
/// with the entry.
pub struct RegisteredClient {
	pub id: u64,
	queue: Mutex<Vec<PendingChange>>,
}

impl RegisteredClient {
	/// Append one change notification, waiting out any in-progress
	/// transfer on this client's connection.
	pub async fn stack_change(&self, change: PendingChange) {
		self.queue.lock().await.push(change);
	}

	/// Drain and clear the queue in one step; never partially drained.
	pub async fn drain_changes(&self) -> Vec<PendingChange> {
		std::mem::take(&mut *self.queue.lock().await)
	}

	/// Mark this client busy for a long outbound stream. The returned
	/// guard holds the queue, so appends from other workers block until
	/// the transfer is done and append ordering stays structural.
	pub async fn begin_transfer(&self) -> MutexGuard<'_, Vec<PendingChange>> {
		self.queue.lock().await
	}
}

struct RegistryInner {
	next_id: u64,
	clients: BTreeMap<u64, Arc<RegisteredClient>>,
}

/// Identifier-to-client table, created at server start and injected into
/// every connection worker.
pub struct Registry {
	inner: Mutex<RegistryInner>,
}

impl Registry {
	pub fn new() -> Registry {
		Registry { inner: Mutex::new(RegistryInner { next_id: 0, clients: BTreeMap::new() }) }
	}

	/// Assign the next identifier and insert a fresh entry with an empty
	/// queue.
	pub async fn register(&self) -> Arc<RegisteredClient> {
		let mut inner = self.inner.lock().await;
		let id = inner.next_id;
		inner.next_id += 1;
		let client = Arc::new(RegisteredClient { id, queue: Mutex::new(Vec::new()) });
		inner.clients.insert(id, Arc::clone(&client));
		client
	}

	/// Drop a client on disconnect, discarding whatever was still queued
	/// for it.
	pub async fn remove(&self, id: u64) {
		self.inner.lock().await.clients.remove(&id);
	}

	pub async fn client_count(&self) -> usize {
		self.inner.lock().await.clients.len()
	}

	/// Queue `change` onto every *other* client registered right now. A
	/// client that registers after this call is never notified; its own
	/// initial listing-based sync covers it.
	pub async fn broadcast(&self, from: u64, change: PendingChange) {
		let others: Vec<Arc<RegisteredClient>> = {
			let inner = self.inner.lock().await;
			inner.clients.values().filter(|c| c.id != from).cloned().collect()
		};
		for client in others {
			debug!("stacking '{}' for client {}", change.to_line(), client.id);
			client.stack_change(change.clone()).await;
		}
	}
}

// vim: ts=4
