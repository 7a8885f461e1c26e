//! ChannelOwner - base trait for every remote object proxy.
//!
//! Proxies are constructed only by the connection when the engine announces
//! an object, receive their [`Channel`] at construction, and change state only
//! in reaction to events delivered through [`ChannelOwner::on_event`].

use std::sync::Arc;

use downcast_rs::{DowncastSync, impl_downcast};
use parking_lot::Mutex;
use serde_json::Value;

use crate::channel::{Channel, Payload};
use crate::connection::ObjectStore;
use crate::error::Result;

/// Private module for the sealed trait pattern.
pub mod private {
	/// Marker trait that seals `ChannelOwner`.
	pub trait Sealed {}
}

/// Base trait for all remote object proxies.
pub trait ChannelOwner: private::Sealed + DowncastSync {
	/// Returns the channel for RPC communication.
	fn channel(&self) -> &Channel;

	/// Returns the unique GUID for this object.
	fn guid(&self) -> &str {
		self.channel().guid()
	}

	/// Returns the protocol type name (e.g., "browser", "page").
	fn type_name(&self) -> &str {
		self.channel().type_name()
	}

	/// Applies construction params.
	///
	/// Guid-valued fields must already be registered in `objects`; a missing
	/// one is a protocol violation.
	fn initialize(&self, params: &Value, objects: &ObjectStore) -> Result<()>;

	/// Updates locally derived state for an event. Runs on the dispatch task,
	/// before the channel's listeners see the same event.
	fn on_event(&self, method: &str, payload: &Payload);

	fn is_disposed(&self) -> bool {
		self.channel().is_disposed()
	}
}

impl_downcast!(sync ChannelOwner);

/// Base implementation of ChannelOwner that can be embedded in proxies.
#[derive(Clone)]
pub struct ChannelOwnerImpl {
	channel: Channel,
	initializer: Arc<Mutex<Value>>,
}

impl ChannelOwnerImpl {
	pub fn new(channel: Channel) -> Self {
		Self {
			channel,
			initializer: Arc::new(Mutex::new(Value::Null)),
		}
	}

	pub fn guid(&self) -> &str {
		self.channel.guid()
	}

	pub fn channel(&self) -> &Channel {
		&self.channel
	}

	/// Returns the last construction params applied to this object.
	pub fn initializer(&self) -> Value {
		self.initializer.lock().clone()
	}

	pub fn set_initializer(&self, params: &Value) {
		*self.initializer.lock() = params.clone();
	}

	/// Logs an event no proxy logic handles.
	pub fn on_event(&self, method: &str, payload: &Payload) {
		tracing::debug!(
			guid = %self.channel.guid(),
			type_name = %self.channel.type_name(),
			method,
			?payload,
			"unhandled event"
		);
	}
}

/// Proxy for an object type this client does not model.
///
/// It keeps traffic that references the object resolvable and can still be
/// driven through raw [`Channel`] calls.
#[derive(Clone)]
pub struct OpaqueObject {
	base: ChannelOwnerImpl,
}

impl OpaqueObject {
	pub fn new(channel: Channel) -> Self {
		Self {
			base: ChannelOwnerImpl::new(channel),
		}
	}

	/// Returns the raw construction params.
	pub fn initializer(&self) -> Value {
		self.base.initializer()
	}
}

impl private::Sealed for OpaqueObject {}

impl ChannelOwner for OpaqueObject {
	fn channel(&self) -> &Channel {
		self.base.channel()
	}

	fn initialize(&self, params: &Value, _objects: &ObjectStore) -> Result<()> {
		self.base.set_initializer(params);
		Ok(())
	}

	fn on_event(&self, method: &str, payload: &Payload) {
		self.base.on_event(method, payload);
	}
}
