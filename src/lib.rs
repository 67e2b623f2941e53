//! # TreeSync - Multi-Replica Directory Mirroring
//!
//! TreeSync keeps a directory tree on one or more client machines mirrored
//! against a tree held by a central server, over one persistent connection
//! per client. Clients poll their working tree for changes, reconcile
//! against the server's listing, and the server fans notifications of each
//! client's changes out to every other connected client.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use treesync::{Server, SyncClient};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     tokio::spawn(Arc::new(Server::new("./server-files")?).run("0.0.0.0:5656"));
//!
//!     let mut client =
//!         SyncClient::connect("127.0.0.1:5656", "./work", Duration::from_secs(5)).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod scan;
pub mod server;
pub mod types;
pub mod util;
pub mod wire;

// Re-export commonly used types and functions
pub use client::SyncClient;
pub use config::Config;
pub use error::{ProtocolError, SyncError};
pub use registry::{RegisteredClient, Registry};
pub use server::Server;
pub use types::{ChangeVerb, FileEntry, FileKind, PendingChange};

// vim: ts=4
