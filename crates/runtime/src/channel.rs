//! Channel - per-object message endpoint.
//!
//! A Channel addresses outgoing calls to one remote object and fans incoming
//! events for that object out to registered listeners. It is shared by the
//! registry entry and every clone of the proxy that owns it, so marking it
//! disposed is observed by all of them.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::channel_owner::ChannelOwner;
use crate::connection::{ConnectionLike, PendingResult};
use crate::error::{Error, Result};

/// Unique identifier for event listeners.
pub type ListenerId = u64;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Event listener. Runs on the dispatch task, so it must not block.
pub type Listener = Arc<dyn Fn(&Payload) + Send + Sync>;

type ListenerMap = HashMap<String, IndexMap<ListenerId, Listener>>;

/// A call result or event payload after guid resolution.
///
/// Object references never reach callers as raw guids: a guid-shaped payload
/// arrives as [`Payload::Object`] holding the registered proxy.
#[derive(Clone)]
pub enum Payload {
	Object(Arc<dyn ChannelOwner>),
	Value(Value),
}

impl Payload {
	pub fn as_object(&self) -> Option<&Arc<dyn ChannelOwner>> {
		match self {
			Payload::Object(object) => Some(object),
			Payload::Value(_) => None,
		}
	}

	pub fn as_value(&self) -> Option<&Value> {
		match self {
			Payload::Object(_) => None,
			Payload::Value(value) => Some(value),
		}
	}

	/// Guid of the referenced object, if this is an object payload.
	pub fn guid(&self) -> Option<&str> {
		self.as_object().map(|object| object.guid())
	}

	/// Returns a clone of the referenced proxy if it has type `T`.
	pub fn downcast<T: ChannelOwner + Clone>(&self) -> Option<T> {
		self.as_object()?.downcast_ref::<T>().cloned()
	}

	pub fn into_value(self) -> Result<Value> {
		match self {
			Payload::Value(value) => Ok(value),
			Payload::Object(object) => Err(Error::UnexpectedResult(format!(
				"expected a plain value, got {} object {}",
				object.type_name(),
				object.guid()
			))),
		}
	}

	pub fn into_object<T: ChannelOwner + Clone>(self) -> Result<T> {
		match self {
			Payload::Object(object) => {
				object.downcast_ref::<T>().cloned().ok_or_else(|| {
					Error::UnexpectedResult(format!(
						"expected {}, got {} object {}",
						std::any::type_name::<T>(),
						object.type_name(),
						object.guid()
					))
				})
			}
			Payload::Value(value) => Err(Error::UnexpectedResult(format!(
				"expected an object reference, got {value}"
			))),
		}
	}
}

impl fmt::Debug for Payload {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Payload::Object(object) => f
				.debug_struct("Object")
				.field("type", &object.type_name())
				.field("guid", &object.guid())
				.finish(),
			Payload::Value(value) => f.debug_tuple("Value").field(value).finish(),
		}
	}
}

/// Channel provides RPC communication for a ChannelOwner.
#[derive(Clone)]
pub struct Channel {
	inner: Arc<ChannelInner>,
}

struct ChannelInner {
	guid: Arc<str>,
	type_name: Arc<str>,
	connection: Weak<dyn ConnectionLike>,
	disposed: AtomicBool,
	timeout: Mutex<Option<Duration>>,
	listeners: Arc<Mutex<ListenerMap>>,
}

impl Channel {
	/// Creates a new Channel for the given object GUID.
	pub fn new(guid: Arc<str>, type_name: Arc<str>, connection: Weak<dyn ConnectionLike>) -> Self {
		Self {
			inner: Arc::new(ChannelInner {
				guid,
				type_name,
				connection,
				disposed: AtomicBool::new(false),
				timeout: Mutex::new(None),
				listeners: Arc::new(Mutex::new(HashMap::new())),
			}),
		}
	}

	/// Returns the GUID this channel represents.
	pub fn guid(&self) -> &str {
		&self.inner.guid
	}

	/// Returns the declared protocol type.
	pub fn type_name(&self) -> &str {
		&self.inner.type_name
	}

	pub fn is_disposed(&self) -> bool {
		self.inner.disposed.load(Ordering::SeqCst)
	}

	/// Marks the channel dead and drops its listeners.
	pub(crate) fn mark_disposed(&self) {
		self.inner.disposed.store(true, Ordering::SeqCst);
		self.inner.listeners.lock().clear();
	}

	/// Sets the timeout applied by the awaiting helpers (`call`, `send`, ...).
	pub fn set_timeout(&self, timeout: Option<Duration>) {
		*self.inner.timeout.lock() = timeout;
	}

	/// Returns the owning connection, or `ConnectionClosed` once it is gone.
	pub fn connection(&self) -> Result<Arc<dyn ConnectionLike>> {
		self.inner
			.connection
			.upgrade()
			.ok_or_else(|| Error::ConnectionClosed("connection dropped".to_string()))
	}

	/// Issues a call without waiting for it.
	///
	/// Fails locally, without touching the transport, if the object was disposed.
	pub fn issue(&self, method: &str, params: Value) -> Result<PendingResult> {
		if self.is_disposed() {
			return Err(Error::ObjectDisposed {
				guid: self.guid().to_string(),
				type_name: self.type_name().to_string(),
			});
		}
		self.connection()?
			.send_message(&self.inner.guid, method, params)
	}

	/// Issues a call and awaits its resolved payload.
	pub async fn call<P: Serialize>(&self, method: &str, params: P) -> Result<Payload> {
		let pending = self.issue(method, into_params(params)?)?;
		let timeout = *self.inner.timeout.lock();
		match timeout {
			Some(timeout) => pending.with_timeout(timeout).await,
			None => pending.await,
		}
	}

	/// Sends a method call and deserializes a plain-value result.
	pub async fn send<P: Serialize, R: DeserializeOwned>(&self, method: &str, params: P) -> Result<R> {
		let value = self.call(method, params).await?.into_value()?;
		serde_json::from_value(value).map_err(Into::into)
	}

	/// Sends a method call with no parameters.
	pub async fn send_no_params<R: DeserializeOwned>(&self, method: &str) -> Result<R> {
		self.send(method, Value::Null).await
	}

	/// Sends a method call that returns no result (void).
	pub async fn send_no_result<P: Serialize>(&self, method: &str, params: P) -> Result<()> {
		self.call(method, params).await.map(|_| ())
	}

	/// Sends a method call whose result is a reference to a `T` proxy.
	pub async fn send_object<P: Serialize, T: ChannelOwner + Clone>(
		&self,
		method: &str,
		params: P,
	) -> Result<T> {
		self.call(method, params).await?.into_object()
	}

	/// Like [`send_object`](Self::send_object), but a `null` result is `None`.
	pub async fn send_optional_object<P: Serialize, T: ChannelOwner + Clone>(
		&self,
		method: &str,
		params: P,
	) -> Result<Option<T>> {
		match self.call(method, params).await? {
			Payload::Value(Value::Null) => Ok(None),
			payload => payload.into_object().map(Some),
		}
	}

	/// Registers a listener for `event`. Dropping the returned
	/// [`Subscription`] unregisters it.
	pub fn on<F>(&self, event: &str, listener: F) -> Subscription
	where
		F: Fn(&Payload) + Send + Sync + 'static,
	{
		let id = NEXT_LISTENER_ID.fetch_add(1, Ordering::SeqCst);
		self.inner
			.listeners
			.lock()
			.entry(event.to_string())
			.or_default()
			.insert(id, Arc::new(listener));
		Subscription {
			event: event.to_string(),
			id,
			listeners: Arc::downgrade(&self.inner.listeners),
		}
	}

	pub fn listener_count(&self, event: &str) -> usize {
		self.inner
			.listeners
			.lock()
			.get(event)
			.map_or(0, IndexMap::len)
	}

	/// Delivers an event to the listeners registered for it, in registration order.
	pub fn dispatch_event(&self, event: &str, payload: &Payload) {
		let listeners: Vec<Listener> = match self.inner.listeners.lock().get(event) {
			Some(map) => map.values().cloned().collect(),
			None => return,
		};
		for listener in listeners {
			listener(payload);
		}
	}
}

impl fmt::Debug for Channel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Channel")
			.field("guid", &self.guid())
			.field("type", &self.type_name())
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

/// Requests always carry an object; `null` and `()` become `{}`.
fn into_params<P: Serialize>(params: P) -> Result<Value> {
	match serde_json::to_value(params)? {
		Value::Null => Ok(Value::Object(Map::new())),
		value => Ok(value),
	}
}

/// RAII handle that unregisters a listener on drop.
///
/// Holds a weak reference to the listener map, so dropping it after the
/// channel is gone is a no-op.
pub struct Subscription {
	event: String,
	id: ListenerId,
	listeners: Weak<Mutex<ListenerMap>>,
}

impl Subscription {
	pub fn id(&self) -> ListenerId {
		self.id
	}

	/// Explicitly unsubscribes. Equivalent to dropping.
	pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(map) = self.listeners.upgrade() {
			let mut map = map.lock();
			if let Some(listeners) = map.get_mut(&self.event) {
				listeners.shift_remove(&self.id);
				if listeners.is_empty() {
					map.remove(&self.event);
				}
			}
		}
	}
}
