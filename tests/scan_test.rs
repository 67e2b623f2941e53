//! File tree scanner tests

use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

use treesync::scan::scan_tree;
use treesync::types::FileKind;

// Helper to create a file with content
fn create_file(dir: &Path, name: &str, content: &[u8]) {
	let path = dir.join(name);
	let mut file = fs::File::create(&path).unwrap();
	file.write_all(content).unwrap();
}

#[test]
fn empty_directory_scans_empty() {
	let dir = TempDir::new().unwrap();
	let entries = scan_tree(dir.path()).unwrap();
	assert!(entries.is_empty());
}

#[test]
fn listing_is_relative_and_sorted() {
	let dir = TempDir::new().unwrap();
	create_file(dir.path(), "zeta.txt", b"z");
	create_file(dir.path(), "alpha.txt", b"a");
	fs::create_dir(dir.path().join("mid")).unwrap();
	create_file(dir.path(), "mid/inner.txt", b"i");

	let entries = scan_tree(dir.path()).unwrap();
	let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
	assert_eq!(paths, vec!["alpha.txt", "mid", "mid/inner.txt", "zeta.txt"]);

	// No absolute paths, no leading separators
	for path in &paths {
		assert!(!path.starts_with('/'));
	}
}

#[test]
fn kinds_match_the_filesystem() {
	let dir = TempDir::new().unwrap();
	create_file(dir.path(), "file.bin", b"data");
	fs::create_dir(dir.path().join("folder")).unwrap();

	let entries = scan_tree(dir.path()).unwrap();
	assert_eq!(entries.len(), 2);
	assert_eq!(entries[0].path, "file.bin");
	assert_eq!(entries[0].kind, FileKind::File);
	assert_eq!(entries[1].path, "folder");
	assert_eq!(entries[1].kind, FileKind::Dir);
}

#[test]
fn deep_nesting_is_fully_covered() {
	let dir = TempDir::new().unwrap();
	fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
	create_file(dir.path(), "a/b/c/leaf.txt", b"leaf");

	let entries = scan_tree(dir.path()).unwrap();
	let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
	assert_eq!(paths, vec!["a", "a/b", "a/b/c", "a/b/c/leaf.txt"]);
}

#[test]
fn a_path_never_appears_twice() {
	let dir = TempDir::new().unwrap();
	fs::create_dir_all(dir.path().join("x/y")).unwrap();
	create_file(dir.path(), "x/f1", b"1");
	create_file(dir.path(), "x/y/f2", b"2");

	let entries = scan_tree(dir.path()).unwrap();
	let mut paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
	let before = paths.len();
	paths.dedup();
	assert_eq!(paths.len(), before);
}

#[test]
fn missing_root_propagates_the_error() {
	let dir = TempDir::new().unwrap();
	let gone = dir.path().join("does-not-exist");
	assert!(scan_tree(&gone).is_err());
}

// vim: ts=4
