//! Protocol messages exchanged with the automation engine.
//!
//! The client only ever writes [`Request`]s. Everything the engine writes back
//! is either a [`Response`] (carries the `id` of the request it answers) or an
//! [`Event`] (no `id`, addressed to an object by `guid`). Object lifecycle
//! notifications are events with reserved method names.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event method announcing a new remote object.
pub const CREATE_METHOD: &str = "__create__";

/// Event method delivering the construction params of an already created object.
pub const INIT_METHOD: &str = "__init__";

/// Event method announcing that a remote object is gone.
pub const DISPOSE_METHOD: &str = "__dispose__";

/// Request sent from the client to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	/// Request id, unique and increasing per connection.
	pub id: u32,
	/// Target object.
	#[serde(
		serialize_with = "serialize_arc_str",
		deserialize_with = "deserialize_arc_str"
	)]
	pub guid: Arc<str>,
	pub method: String,
	pub params: Value,
}

/// Serde helpers for `Arc<str>` serialization
pub fn serialize_arc_str<S>(arc: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
where
	S: serde::Serializer,
{
	serializer.serialize_str(arc)
}

pub fn deserialize_arc_str<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let s: String = Deserialize::deserialize(deserializer)?;
	Ok(Arc::from(s.as_str()))
}

/// Response to a previously issued [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	/// Id of the request this answers.
	pub id: u32,
	/// Success payload (absent or `null` for void calls).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Error payload; takes precedence over `result`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<RemoteError>,
}

/// Error description as sent by the engine.
///
/// Engines have shipped all three shapes, so all three are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteError {
	/// `{"error": {"message": ..., "name": ..., "stack": ...}}`
	Wrapped { error: ErrorPayload },
	/// `{"message": ..., "name": ..., "stack": ...}`
	Payload(ErrorPayload),
	/// A bare message string.
	Text(String),
}

impl RemoteError {
	/// Flattens any accepted shape into an [`ErrorPayload`].
	pub fn into_payload(self) -> ErrorPayload {
		match self {
			RemoteError::Wrapped { error } | RemoteError::Payload(error) => error,
			RemoteError::Text(message) => ErrorPayload {
				message,
				name: None,
				stack: None,
			},
		}
	}
}

/// Protocol error details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorPayload {
	#[serde(default)]
	pub message: String,
	/// Error class name (e.g. "TimeoutError").
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stack: Option<String>,
}

/// Unsolicited message addressed to one remote object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
	/// Object the event is about. For `__create__` this is the new object's guid.
	#[serde(
		serialize_with = "serialize_arc_str",
		deserialize_with = "deserialize_arc_str"
	)]
	pub guid: Arc<str>,
	pub method: String,
	/// Declared object type, only present on `__create__`.
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub type_name: Option<String>,
	#[serde(default)]
	pub params: Value,
}

impl Event {
	/// Returns true for `__create__`, `__init__` and `__dispose__`.
	pub fn is_lifecycle(&self) -> bool {
		matches!(
			self.method.as_str(),
			CREATE_METHOD | INIT_METHOD | DISPOSE_METHOD
		)
	}
}

/// Discriminated union of inbound messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Has an `id` field.
	Response(Response),
	/// Has `guid` and `method`, no `id`.
	Event(Event),
	/// Anything else that is still valid JSON (forward-compatible catch-all).
	Unknown(Value),
}

/// Returns the guid if `value` is an object reference (`{"guid": "..."}`).
pub fn guid_ref(value: &Value) -> Option<&str> {
	value.as_object()?.get("guid")?.as_str()
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_message_deserialization_response() {
		let json = r#"{"id": 42, "result": {"status": "ok"}}"#;
		let message: Message = serde_json::from_str(json).unwrap();

		match message {
			Message::Response(response) => {
				assert_eq!(response.id, 42);
				assert!(response.result.is_some());
				assert!(response.error.is_none());
			}
			_ => panic!("Expected Response"),
		}
	}

	#[test]
	fn test_message_deserialization_void_response() {
		let message: Message = serde_json::from_str(r#"{"id": 3}"#).unwrap();
		match message {
			Message::Response(response) => {
				assert_eq!(response.id, 3);
				assert!(response.result.is_none());
			}
			_ => panic!("Expected Response"),
		}
	}

	#[test]
	fn test_message_deserialization_event() {
		let json = r#"{"guid": "page@abc", "method": "frameAttached", "params": {"guid": "frame@1"}}"#;
		let message: Message = serde_json::from_str(json).unwrap();

		match message {
			Message::Event(event) => {
				assert_eq!(event.guid.as_ref(), "page@abc");
				assert_eq!(event.method, "frameAttached");
				assert_eq!(guid_ref(&event.params), Some("frame@1"));
				assert!(!event.is_lifecycle());
			}
			_ => panic!("Expected Event"),
		}
	}

	#[test]
	fn test_message_deserialization_create() {
		let json = r#"{"guid": "browser@1", "method": "__create__", "type": "browser"}"#;
		let message: Message = serde_json::from_str(json).unwrap();

		match message {
			Message::Event(event) => {
				assert_eq!(event.method, CREATE_METHOD);
				assert_eq!(event.type_name.as_deref(), Some("browser"));
				assert!(event.params.is_null());
				assert!(event.is_lifecycle());
			}
			_ => panic!("Expected Event"),
		}
	}

	#[test]
	fn test_unknown_message_is_kept() {
		let message: Message = serde_json::from_str(r#"{"hello": "world"}"#).unwrap();
		assert!(matches!(message, Message::Unknown(_)));
	}

	#[test]
	fn test_error_shapes() {
		let wrapped: RemoteError =
			serde_json::from_value(json!({"error": {"message": "boom", "name": "TimeoutError"}}))
				.unwrap();
		let payload = wrapped.into_payload();
		assert_eq!(payload.message, "boom");
		assert_eq!(payload.name.as_deref(), Some("TimeoutError"));

		let bare: RemoteError =
			serde_json::from_value(json!({"message": "bad selector", "stack": "at foo"})).unwrap();
		let payload = bare.into_payload();
		assert_eq!(payload.message, "bad selector");
		assert_eq!(payload.stack.as_deref(), Some("at foo"));

		let text: RemoteError = serde_json::from_value(json!("plain failure")).unwrap();
		assert_eq!(text.into_payload().message, "plain failure");
	}

	#[test]
	fn test_request_serialization() {
		let request = Request {
			id: 7,
			guid: Arc::from("page@abc123"),
			method: "goto".to_string(),
			params: json!({"url": "https://example.com"}),
		};

		let value = serde_json::to_value(&request).unwrap();
		assert_eq!(
			value,
			json!({
				"id": 7,
				"guid": "page@abc123",
				"method": "goto",
				"params": {"url": "https://example.com"}
			})
		);
	}

	#[test]
	fn test_guid_ref() {
		assert_eq!(guid_ref(&json!({"guid": "g1"})), Some("g1"));
		assert_eq!(guid_ref(&json!({"guid": 1})), None);
		assert_eq!(guid_ref(&json!("g1")), None);
		assert_eq!(guid_ref(&Value::Null), None);
	}
}
