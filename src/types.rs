use std::time::Duration;

/// Default TCP port for the sync server
pub const DEFAULT_PORT: u16 = 5656;

/// Seconds between client poll cycles. Also the width of the "recently
/// modified" re-upload window, so the two stay in lockstep.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Kind tag for a scanned filesystem entry
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FileKind {
	File,
	Dir,
}

/// One entry of a directory listing: a relative path plus its kind.
///
/// Paths carry no leading separator. Listings are kept sorted ascending by
/// path and a path appears at most once per scan; both diff loops and the
/// wire listing rely on that order being reproducible between runs.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FileEntry {
	pub kind: FileKind,
	pub path: String,
}

impl FileEntry {
	pub fn new(kind: FileKind, path: impl Into<String>) -> FileEntry {
		FileEntry { kind, path: path.into() }
	}

	/// Wire form: "FILE <relpath>" or "DIR <relpath>"
	pub fn to_line(&self) -> String {
		match self.kind {
			FileKind::File => format!("FILE {}", self.path),
			FileKind::Dir => format!("DIR {}", self.path),
		}
	}

	/// Parse the wire form. Only the first space splits tag from path, so
	/// paths containing spaces survive the round trip.
	pub fn parse_line(line: &str) -> Option<FileEntry> {
		let (tag, path) = line.split_once(' ')?;
		if path.is_empty() {
			return None;
		}
		let kind = match tag {
			"FILE" => FileKind::File,
			"DIR" => FileKind::Dir,
			_ => return None,
		};
		Some(FileEntry::new(kind, path))
	}
}

/// What a queued remote-change notification asks the receiving client to do
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChangeVerb {
	Download,
	CreateFolder,
	Delete,
}

impl ChangeVerb {
	pub fn as_wire(&self) -> &'static str {
		match self {
			ChangeVerb::Download => "DOWNLOAD",
			ChangeVerb::CreateFolder => "CREATE_FOLDER",
			ChangeVerb::Delete => "DELETE",
		}
	}
}

/// A server-side mutation awaiting delivery to one other client.
///
/// Queued onto every other registered client when an upload, folder
/// creation, or delete completes; drained in append order by that client's
/// next STACKED_CHANGES request.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PendingChange {
	pub verb: ChangeVerb,
	pub path: String,
}

impl PendingChange {
	pub fn new(verb: ChangeVerb, path: impl Into<String>) -> PendingChange {
		PendingChange { verb, path: path.into() }
	}

	/// Wire form: "<VERB> <relpath>"
	pub fn to_line(&self) -> String {
		format!("{} {}", self.verb.as_wire(), self.path)
	}

	pub fn parse_line(line: &str) -> Option<PendingChange> {
		let (tag, path) = line.split_once(' ')?;
		if path.is_empty() {
			return None;
		}
		let verb = match tag {
			"DOWNLOAD" => ChangeVerb::Download,
			"CREATE_FOLDER" => ChangeVerb::CreateFolder,
			"DELETE" => ChangeVerb::Delete,
			_ => return None,
		};
		Some(PendingChange::new(verb, path))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_entry_lines_keep_spaces_in_paths() {
		let entry = FileEntry::new(FileKind::File, "dir with space/file name.txt");
		let parsed = FileEntry::parse_line(&entry.to_line()).unwrap();
		assert_eq!(parsed, entry);
	}

	#[test]
	fn test_entry_rejects_unknown_tags_and_empty_paths() {
		assert!(FileEntry::parse_line("SOCKET weird").is_none());
		assert!(FileEntry::parse_line("FILE ").is_none());
		assert!(FileEntry::parse_line("FILE").is_none());
	}

	#[test]
	fn test_change_lines_round_trip() {
		let change = PendingChange::new(ChangeVerb::CreateFolder, "a/b");
		assert_eq!(change.to_line(), "CREATE_FOLDER a/b");
		assert_eq!(PendingChange::parse_line("CREATE_FOLDER a/b").unwrap(), change);
	}

	#[test]
	fn test_change_rejects_unknown_verbs() {
		assert!(PendingChange::parse_line("UPLOAD x").is_none());
		assert!(PendingChange::parse_line("nonsense").is_none());
	}
}

// vim: ts=4
