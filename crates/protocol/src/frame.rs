//! NUL-delimited JSON framing.
//!
//! Each frame is the JSON encoding of one message followed by a single `0x00`
//! byte. JSON text escapes every control character, so the delimiter never
//! appears inside an encoded payload.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Byte that terminates every frame.
pub const FRAME_DELIMITER: u8 = 0;

/// Errors raised while encoding or decoding a frame.
#[derive(Debug, Error)]
pub enum FrameError {
	/// Two delimiters with nothing between them.
	#[error("empty frame")]
	Empty,

	/// The chunk is not well-formed JSON for the expected message shape.
	#[error("malformed frame: {0}")]
	Malformed(#[source] serde_json::Error),

	/// The stream ended after a partial frame.
	#[error("stream ended mid-frame ({0} bytes without delimiter)")]
	Truncated(usize),

	#[error("failed to encode frame: {0}")]
	Encode(#[source] serde_json::Error),
}

/// Serializes `message` and appends the frame delimiter.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, FrameError> {
	let mut bytes = serde_json::to_vec(message).map_err(FrameError::Encode)?;
	bytes.push(FRAME_DELIMITER);
	Ok(bytes)
}

/// Decodes one delimited chunk. A trailing delimiter, if present, is ignored.
pub fn decode_frame<T: DeserializeOwned>(chunk: &[u8]) -> Result<T, FrameError> {
	let chunk = chunk.strip_suffix(&[FRAME_DELIMITER]).unwrap_or(chunk);
	if chunk.is_empty() {
		return Err(FrameError::Empty);
	}
	serde_json::from_slice(chunk).map_err(FrameError::Malformed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::message::{Message, Request};
	use serde_json::{Value, json};
	use std::sync::Arc;

	#[test]
	fn test_frame_ends_with_single_delimiter() {
		let request = Request {
			id: 1,
			guid: Arc::from("chromium"),
			method: "launch".to_string(),
			// Embedded NUL must be escaped, not written raw.
			params: json!({"options": {"arg": "a\u{0}b"}}),
		};

		let frame = encode_frame(&request).unwrap();
		assert_eq!(frame.last(), Some(&FRAME_DELIMITER));
		assert_eq!(
			frame.iter().filter(|b| **b == FRAME_DELIMITER).count(),
			1,
			"delimiter must only terminate the frame"
		);

		let decoded: Value = decode_frame(&frame).unwrap();
		assert_eq!(decoded["params"]["options"]["arg"], "a\u{0}b");
	}

	#[test]
	fn test_decode_without_delimiter() {
		let message: Message = decode_frame(br#"{"id": 1, "result": null}"#).unwrap();
		assert!(matches!(message, Message::Response(r) if r.id == 1));
	}

	#[test]
	fn test_decode_empty_chunk() {
		let result: Result<Value, _> = decode_frame(&[FRAME_DELIMITER]);
		assert!(matches!(result, Err(FrameError::Empty)));
	}

	#[test]
	fn test_decode_malformed_chunk() {
		let result: Result<Message, _> = decode_frame(b"{\"id\": 1,\0");
		assert!(matches!(result, Err(FrameError::Malformed(_))));
		assert!(result.unwrap_err().to_string().starts_with("malformed frame"));
	}
}
