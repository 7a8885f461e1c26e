//! Wire types for the pwire automation protocol.
//!
//! Messages travel as JSON text, one message per frame, each frame terminated
//! by a single NUL byte. This crate owns the message shapes and the frame
//! codec; it knows nothing about request correlation or remote objects.

pub mod frame;
pub mod message;

pub use frame::{FRAME_DELIMITER, FrameError, decode_frame, encode_frame};
pub use message::{
	CREATE_METHOD, DISPOSE_METHOD, ErrorPayload, Event, INIT_METHOD, Message, RemoteError,
	Request, Response, guid_ref,
};
