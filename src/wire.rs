//! Transport frame codec
//!
//! Frames typed values onto a bidirectional byte stream: length-prefixed
//! UTF-8 strings for verbs, filenames and listing lines, little-endian
//! integers, one-byte booleans, and length-prefixed raw payloads for file
//! bodies. The receiver always knows exactly how many payload bytes follow
//! a header; stream end is never used as a payload boundary in either
//! transfer direction.
//!
//! The codec is generic over the stream so the same code runs over a
//! `TcpStream` in production and an in-memory duplex pipe in tests.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, SyncError};

/// Command verbs and sentinels used on the wire
pub mod verb {
	pub const LIST: &str = "LIST";
	pub const LIST_END: &str = "LIST_END";
	pub const STACKED_CHANGES: &str = "STACKED_CHANGES";
	pub const STACKED_CHANGES_END: &str = "STACKED_CHANGES_END";
	pub const UPLOAD: &str = "UPLOAD";
	pub const DOWNLOAD: &str = "DOWNLOAD";
	pub const CREATE_FOLDER: &str = "CREATE_FOLDER";
	pub const DELETE: &str = "DELETE";
	pub const EXISTS: &str = "EXISTS";
}

/// Upper bound for a single string frame; a larger announced length is a
/// malformed frame and fatal to the connection.
pub const MAX_STRING_LEN: u32 = 64 * 1024;

/// Chunk size for payload copies
const COPY_BUF: usize = 64 * 1024;

/// Which side of a payload copy failed
#[derive(Debug)]
pub enum PayloadError {
	/// The byte stream itself failed; the connection is unusable.
	Stream(io::Error),

	/// The local destination failed. The remaining payload bytes have
	/// already been drained off the stream, so the connection is still in
	/// frame sync and may keep serving.
	Sink(io::Error),
}

impl PayloadError {
	pub fn into_io(self) -> io::Error {
		match self {
			PayloadError::Stream(err) | PayloadError::Sink(err) => err,
		}
	}
}

impl From<PayloadError> for SyncError {
	fn from(err: PayloadError) -> Self {
		SyncError::Io(err.into_io())
	}
}

/// A bidirectional byte stream plus the encode/decode state for framed
/// values. One `Wire` per connection, owned by that connection's worker.
pub struct Wire<S> {
	stream: S,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Wire<S> {
	pub fn new(stream: S) -> Wire<S> {
		Wire { stream }
	}

	pub async fn send_str(&mut self, value: &str) -> Result<(), SyncError> {
		let bytes = value.as_bytes();
		self.stream.write_all(&(bytes.len() as u32).to_le_bytes()).await?;
		self.stream.write_all(bytes).await?;
		self.stream.flush().await?;
		Ok(())
	}

	pub async fn recv_str(&mut self) -> Result<String, SyncError> {
		let mut header = [0u8; 4];
		self.stream.read_exact(&mut header).await?;
		let len = u32::from_le_bytes(header);
		if len > MAX_STRING_LEN {
			return Err(ProtocolError::FrameTooLarge { len, max: MAX_STRING_LEN }.into());
		}
		let mut buf = vec![0u8; len as usize];
		self.stream.read_exact(&mut buf).await?;
		String::from_utf8(buf).map_err(|_| SyncError::from(ProtocolError::InvalidUtf8))
	}

	pub async fn send_u64(&mut self, value: u64) -> Result<(), SyncError> {
		self.stream.write_all(&value.to_le_bytes()).await?;
		self.stream.flush().await?;
		Ok(())
	}

	pub async fn recv_u64(&mut self) -> Result<u64, SyncError> {
		let mut buf = [0u8; 8];
		self.stream.read_exact(&mut buf).await?;
		Ok(u64::from_le_bytes(buf))
	}

	pub async fn send_bool(&mut self, value: bool) -> Result<(), SyncError> {
		self.stream.write_all(&[value as u8]).await?;
		self.stream.flush().await?;
		Ok(())
	}

	pub async fn recv_bool(&mut self) -> Result<bool, SyncError> {
		let mut buf = [0u8; 1];
		self.stream.read_exact(&mut buf).await?;
		Ok(buf[0] != 0)
	}

	/// Every exchange starts with a verb and a filename, always sent as a
	/// pair. The filename is the empty string when the verb takes none.
	pub async fn send_command(&mut self, verb: &str, filename: &str) -> Result<(), SyncError> {
		self.send_str(verb).await?;
		self.send_str(filename).await
	}

	pub async fn recv_command(&mut self) -> Result<(String, String), SyncError> {
		let verb = self.recv_str().await?;
		let filename = self.recv_str().await?;
		Ok((verb, filename))
	}

	/// Write `len` as the payload header, then exactly `len` bytes read
	/// from `source`. A source that runs dry early poisons the stream, so
	/// that is surfaced as a connection-fatal error.
	pub async fn send_payload<R>(&mut self, len: u64, source: &mut R) -> Result<(), SyncError>
	where
		R: AsyncRead + Unpin,
	{
		self.stream.write_all(&len.to_le_bytes()).await?;
		let mut buf = vec![0u8; COPY_BUF];
		let mut remaining = len;
		while remaining > 0 {
			let want = remaining.min(COPY_BUF as u64) as usize;
			let n = source.read(&mut buf[..want]).await?;
			if n == 0 {
				return Err(SyncError::Io(io::Error::new(
					io::ErrorKind::UnexpectedEof,
					"payload source ended before the announced length",
				)));
			}
			self.stream.write_all(&buf[..n]).await?;
			remaining -= n as u64;
		}
		self.stream.flush().await?;
		Ok(())
	}

	/// Read one length-prefixed payload into `sink`, returning the byte
	/// count. When the sink fails mid-copy the rest of the payload is
	/// still drained off the stream before the failure is reported, so the
	/// caller can keep using the connection.
	pub async fn recv_payload<W>(&mut self, sink: &mut W) -> Result<u64, PayloadError>
	where
		W: AsyncWrite + Unpin,
	{
		let mut header = [0u8; 8];
		self.stream.read_exact(&mut header).await.map_err(PayloadError::Stream)?;
		let len = u64::from_le_bytes(header);

		let mut buf = vec![0u8; COPY_BUF];
		let mut received = 0u64;
		let mut sink_err: Option<io::Error> = None;
		while received < len {
			let want = (len - received).min(COPY_BUF as u64) as usize;
			let n = self.stream.read(&mut buf[..want]).await.map_err(PayloadError::Stream)?;
			if n == 0 {
				return Err(PayloadError::Stream(io::Error::new(
					io::ErrorKind::UnexpectedEof,
					"stream ended inside a payload",
				)));
			}
			received += n as u64;
			if sink_err.is_none() {
				if let Err(err) = sink.write_all(&buf[..n]).await {
					sink_err = Some(err);
				}
			}
		}

		if let Some(err) = sink_err {
			return Err(PayloadError::Sink(err));
		}
		sink.flush().await.map_err(PayloadError::Sink)?;
		Ok(len)
	}
}

// vim: ts=4
