//! Client registry and change propagation tests

use std::sync::Arc;
use std::time::Duration;

use treesync::registry::Registry;
use treesync::types::{ChangeVerb, PendingChange};

#[tokio::test]
async fn identifiers_are_monotonic_and_never_reused() {
	let registry = Registry::new();
	let a = registry.register().await;
	let b = registry.register().await;
	assert!(b.id > a.id);

	registry.remove(a.id).await;
	registry.remove(b.id).await;
	assert_eq!(registry.client_count().await, 0);

	let c = registry.register().await;
	assert!(c.id > b.id);
}

#[tokio::test]
async fn broadcast_skips_the_originator() {
	let registry = Registry::new();
	let a = registry.register().await;
	let b = registry.register().await;
	let c = registry.register().await;

	registry.broadcast(a.id, PendingChange::new(ChangeVerb::Download, "f.txt")).await;

	assert!(a.drain_changes().await.is_empty());
	assert_eq!(b.drain_changes().await, vec![PendingChange::new(ChangeVerb::Download, "f.txt")]);
	assert_eq!(c.drain_changes().await, vec![PendingChange::new(ChangeVerb::Download, "f.txt")]);
}

#[tokio::test]
async fn queue_preserves_append_order_and_drains_atomically() {
	let registry = Registry::new();
	let a = registry.register().await;
	let b = registry.register().await;

	registry.broadcast(a.id, PendingChange::new(ChangeVerb::Download, "x")).await;
	registry.broadcast(a.id, PendingChange::new(ChangeVerb::Delete, "y")).await;
	registry.broadcast(a.id, PendingChange::new(ChangeVerb::CreateFolder, "z")).await;

	let drained = b.drain_changes().await;
	assert_eq!(
		drained,
		vec![
			PendingChange::new(ChangeVerb::Download, "x"),
			PendingChange::new(ChangeVerb::Delete, "y"),
			PendingChange::new(ChangeVerb::CreateFolder, "z"),
		]
	);

	// Drained and cleared in one step
	assert!(b.drain_changes().await.is_empty());
}

#[tokio::test]
async fn late_joiners_see_nothing_from_before_registration() {
	let registry = Registry::new();
	let a = registry.register().await;
	registry.broadcast(a.id, PendingChange::new(ChangeVerb::Download, "early.txt")).await;

	let late = registry.register().await;
	assert!(late.drain_changes().await.is_empty());
}

#[tokio::test]
async fn transfer_guard_blocks_appends_until_released() {
	let registry = Registry::new();
	let a = registry.register().await;

	let guard = a.begin_transfer().await;

	let target = Arc::clone(&a);
	let append = tokio::spawn(async move {
		target.stack_change(PendingChange::new(ChangeVerb::Download, "big.bin")).await;
	});

	tokio::time::sleep(Duration::from_millis(50)).await;
	assert!(!append.is_finished(), "append went through while the transfer was in progress");

	drop(guard);
	append.await.unwrap();
	assert_eq!(a.drain_changes().await, vec![PendingChange::new(ChangeVerb::Download, "big.bin")]);
}

// vim: ts=4
