//! Pipe transport carrying NUL-delimited frames.
//!
//! The transport is split into a [`FrameSender`] owned by the connection's
//! writer task and a [`FrameReceiver`] owned by the dispatch loop, so reads
//! and writes never contend for a lock.

use pwire_protocol::{FRAME_DELIMITER, FrameError, decode_frame, encode_frame};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::Result;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Bidirectional frame transport over a pair of byte streams
/// (typically the driver's stdin and stdout).
pub struct PipeTransport {
	sender: FrameSender,
	receiver: FrameReceiver,
}

impl PipeTransport {
	/// Creates a transport writing to `writer` and reading from `reader`.
	pub fn new<W, R>(writer: W, reader: R) -> Self
	where
		W: AsyncWrite + Send + Unpin + 'static,
		R: AsyncRead + Send + Unpin + 'static,
	{
		Self {
			sender: FrameSender {
				writer: Box::new(writer),
			},
			receiver: FrameReceiver {
				reader: BufReader::new(Box::new(reader)),
				buf: Vec::new(),
			},
		}
	}

	/// Splits into the write and read halves.
	pub fn into_parts(self) -> (FrameSender, FrameReceiver) {
		(self.sender, self.receiver)
	}
}

/// Write half: appends the delimiter and flushes every frame.
pub struct FrameSender {
	writer: BoxedWriter,
}

impl FrameSender {
	/// Writes an already encoded frame (delimiter included).
	pub async fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
		self.writer.write_all(frame).await?;
		self.writer.flush().await?;
		Ok(())
	}

	/// Encodes and writes one message.
	pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
		let frame = encode_frame(message)?;
		self.send_frame(&frame).await
	}
}

/// Read half: splits the inbound stream on the delimiter.
pub struct FrameReceiver {
	reader: BufReader<BoxedReader>,
	buf: Vec<u8>,
}

impl FrameReceiver {
	/// Reads and decodes the next frame.
	///
	/// Returns `Ok(None)` on a clean end of stream. A partial frame at end of
	/// stream is a [`FrameError::Truncated`].
	pub async fn next_frame<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
		self.buf.clear();
		let n = self.reader.read_until(FRAME_DELIMITER, &mut self.buf).await?;
		if n == 0 {
			return Ok(None);
		}
		if self.buf.last() != Some(&FRAME_DELIMITER) {
			return Err(FrameError::Truncated(n).into());
		}
		Ok(Some(decode_frame(&self.buf)?))
	}
}
