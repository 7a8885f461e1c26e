//! Error types for the pwire runtime.

use pwire_protocol::{ErrorPayload, FrameError};
use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the pwire runtime.
#[derive(Debug, Error)]
pub enum Error {
	/// Malformed frame on the wire. Fatal to the connection.
	#[error("Framing error: {0}")]
	Framing(#[from] FrameError),

	/// The peer and the client disagree about protocol state (unknown guid,
	/// unknown request id, duplicate creation). Fatal to the connection.
	#[error("Protocol invariant violated: {0}")]
	ProtocolInvariant(String),

	/// The engine reported an error for one specific call.
	#[error("{name}: {message}")]
	Remote {
		/// Error class name (e.g., "TimeoutError", "Error")
		name: String,
		message: String,
		/// Stack trace from the engine (if available)
		stack: Option<String>,
	},

	/// The transport is gone; delivered to every pending and later call.
	#[error("Connection closed: {0}")]
	ConnectionClosed(String),

	/// The target object was disposed before the call was issued.
	#[error("Object disposed: cannot call {type_name} {guid}")]
	ObjectDisposed { guid: String, type_name: String },

	/// The result did not have the expected shape (value vs. object, wrong object type).
	#[error("Unexpected result: {0}")]
	UnexpectedResult(String),

	/// Caller-side timeout elapsed.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// `Connection::run` was called more than once.
	#[error("Dispatch loop already started")]
	AlreadyRunning,

	/// Failed to launch the driver process.
	#[error("Failed to launch driver: {0}")]
	LaunchFailed(String),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns the error name if this is a Remote error.
	pub fn error_name(&self) -> Option<&str> {
		match self {
			Error::Remote { name, .. } => Some(name),
			_ => None,
		}
	}

	/// Returns the stack trace if this is a Remote error with a stack.
	pub fn stack_trace(&self) -> Option<&str> {
		match self {
			Error::Remote { stack, .. } => stack.as_deref(),
			_ => None,
		}
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		match self {
			Error::Timeout(_) => true,
			Error::Remote { name, .. } => name == "TimeoutError",
			_ => false,
		}
	}

	pub fn is_connection_closed(&self) -> bool {
		matches!(self, Error::ConnectionClosed(_))
	}

	pub fn is_disposed(&self) -> bool {
		matches!(self, Error::ObjectDisposed { .. })
	}

	/// Returns true for errors that end the connection.
	pub fn is_protocol_violation(&self) -> bool {
		matches!(self, Error::ProtocolInvariant(_) | Error::Framing(_))
	}
}

impl From<ErrorPayload> for Error {
	fn from(error: ErrorPayload) -> Self {
		Error::Remote {
			name: error.name.unwrap_or_else(|| "Error".to_string()),
			message: error.message,
			stack: error.stack,
		}
	}
}
