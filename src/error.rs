//! Error types for treesync operations

use std::error::Error;
use std::fmt;
use std::io;

/// Main error type for client and server sessions
#[derive(Debug)]
pub enum SyncError {
	/// I/O error on the filesystem or the byte stream
	Io(io::Error),

	/// Malformed or unexpected protocol data (nested)
	Protocol(ProtocolError),

	/// Invalid configuration
	InvalidConfig { message: String },

	/// Generic error message
	Other { message: String },
}

impl SyncError {
	/// True when the error means the peer went away. A disconnect ends the
	/// affected session only; it is never retried by the engine itself.
	pub fn is_disconnect(&self) -> bool {
		match self {
			SyncError::Io(err) => matches!(
				err.kind(),
				io::ErrorKind::UnexpectedEof
					| io::ErrorKind::ConnectionReset
					| io::ErrorKind::ConnectionAborted
					| io::ErrorKind::BrokenPipe
			),
			_ => false,
		}
	}

	/// True when the underlying cause is a missing file. Used to skip
	/// paths that vanish between a scan and the transfer that follows it.
	pub fn is_not_found(&self) -> bool {
		matches!(self, SyncError::Io(err) if err.kind() == io::ErrorKind::NotFound)
	}
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Io(err) => write!(f, "I/O error: {}", err),
			SyncError::Protocol(err) => write!(f, "Protocol error: {}", err),
			SyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {}

impl From<io::Error> for SyncError {
	fn from(err: io::Error) -> Self {
		SyncError::Io(err)
	}
}

impl From<ProtocolError> for SyncError {
	fn from(err: ProtocolError) -> Self {
		SyncError::Protocol(err)
	}
}

impl From<String> for SyncError {
	fn from(message: String) -> Self {
		SyncError::Other { message }
	}
}

/// Wire-level errors. All of these are fatal to the connection they
/// occurred on: once frame sync is in doubt the session cannot continue.
#[derive(Debug)]
pub enum ProtocolError {
	/// A string frame announced a length over the fixed cap
	FrameTooLarge { len: u32, max: u32 },

	/// A string frame did not decode as UTF-8
	InvalidUtf8,

	/// The peer sent a command verb this side does not know
	UnknownVerb { verb: String },

	/// A listing line did not match "FILE <path>" or "DIR <path>"
	MalformedEntry { line: String },

	/// A stacked-change line did not match "<VERB> <path>"
	MalformedChange { line: String },

	/// A relative path on the wire was empty, absolute, or tried to
	/// escape the root
	UnsafePath { path: String },
}

impl fmt::Display for ProtocolError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProtocolError::FrameTooLarge { len, max } => {
				write!(f, "frame length {} exceeds maximum {}", len, max)
			}
			ProtocolError::InvalidUtf8 => write!(f, "frame is not valid UTF-8"),
			ProtocolError::UnknownVerb { verb } => write!(f, "unknown verb '{}'", verb),
			ProtocolError::MalformedEntry { line } => {
				write!(f, "malformed listing entry '{}'", line)
			}
			ProtocolError::MalformedChange { line } => {
				write!(f, "malformed stacked change '{}'", line)
			}
			ProtocolError::UnsafePath { path } => write!(f, "unsafe path '{}'", path),
		}
	}
}

impl Error for ProtocolError {}

// vim: ts=4
