//! Small filesystem helpers shared by the client and the server

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{ProtocolError, SyncError};

/// Join a relative wire path under `root`, rejecting anything that could
/// land outside it: empty paths, absolute paths, and parent components.
pub fn join_under_root(root: &Path, rel: &str) -> Result<PathBuf, SyncError> {
	if rel.is_empty() {
		return Err(ProtocolError::UnsafePath { path: rel.to_string() }.into());
	}
	let mut joined = root.to_path_buf();
	for component in Path::new(rel).components() {
		match component {
			Component::Normal(part) => joined.push(part),
			Component::CurDir => {}
			Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
				return Err(ProtocolError::UnsafePath { path: rel.to_string() }.into());
			}
		}
	}
	Ok(joined)
}

/// Remove a file or directory tree. An already-missing path is success, so
/// delete order between a directory and its contents never matters.
pub async fn remove_path(path: &Path) -> io::Result<()> {
	let meta = match tokio::fs::metadata(path).await {
		Ok(meta) => meta,
		Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
		Err(err) => return Err(err),
	};
	let removed = if meta.is_dir() {
		tokio::fs::remove_dir_all(path).await
	} else {
		tokio::fs::remove_file(path).await
	};
	match removed {
		Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
		other => other,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_join_keeps_relative_paths_inside_the_root() {
		let root = Path::new("/srv/data");
		assert_eq!(join_under_root(root, "a/b.txt").unwrap(), PathBuf::from("/srv/data/a/b.txt"));
		assert_eq!(join_under_root(root, "./a").unwrap(), PathBuf::from("/srv/data/a"));
	}

	#[test]
	fn test_join_rejects_escapes() {
		let root = Path::new("/srv/data");
		assert!(join_under_root(root, "").is_err());
		assert!(join_under_root(root, "../evil").is_err());
		assert!(join_under_root(root, "a/../../evil").is_err());
		assert!(join_under_root(root, "/etc/passwd").is_err());
	}

	#[tokio::test]
	async fn test_remove_path_is_idempotent() {
		let dir = tempfile::TempDir::new().unwrap();
		let file = dir.path().join("f.txt");
		std::fs::write(&file, b"x").unwrap();

		remove_path(&file).await.unwrap();
		assert!(!file.exists());
		// Second removal of the same path is still success
		remove_path(&file).await.unwrap();

		let tree = dir.path().join("a/b");
		std::fs::create_dir_all(&tree).unwrap();
		remove_path(&dir.path().join("a")).await.unwrap();
		assert!(!tree.exists());
	}
}

// vim: ts=4
