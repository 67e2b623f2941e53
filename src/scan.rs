//! File tree scanner
//!
//! Recursively lists a directory into relative, sorted `FileEntry` records.
//! Client and server run the exact same scan, which is what makes their
//! listings comparable in the first place.

use std::fs;
use std::io;
use std::path::Path;

use crate::types::{FileEntry, FileKind};

/// List every file and directory under `root` at every depth.
///
/// Paths are relative to `root`, carry no leading separator, and the
/// result is sorted ascending by path. Callers must not assume
/// parent-before-child ordering beyond what the sort happens to give.
/// Side-effect free; a directory that cannot be listed propagates its
/// `io::Error` as-is.
pub fn scan_tree(root: &Path) -> io::Result<Vec<FileEntry>> {
	let mut entries = Vec::new();
	walk(root, root, &mut entries)?;
	entries.sort_by(|a, b| a.path.cmp(&b.path));
	Ok(entries)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<FileEntry>) -> io::Result<()> {
	for entry in fs::read_dir(dir)? {
		let entry = entry?;
		let path = entry.path();
		let rel = match path.strip_prefix(root) {
			Ok(rel) => rel.to_string_lossy().into_owned(),
			Err(_) => continue,
		};
		if entry.file_type()?.is_dir() {
			out.push(FileEntry::new(FileKind::Dir, rel));
			walk(root, &path, out)?;
		} else {
			// Anything that is not a directory transfers as a file
			out.push(FileEntry::new(FileKind::File, rel));
		}
	}
	Ok(())
}

// vim: ts=4
