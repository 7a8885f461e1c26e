//! Object registry: guid to live proxy.
//!
//! The registry is the arena of the client-side object graph. Proxies refer to
//! each other by guid and look each other up here, so retiring an object
//! never leaves a dangling pointer, only a lookup that reports it gone.
//! All inserts and removals happen on the dispatch task; [`DashMap`] lets
//! callers on other tasks read concurrently.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use pwire_protocol::guid_ref;
use serde_json::Value;

use crate::channel::{Channel, Payload};
use crate::channel_owner::{ChannelOwner, OpaqueObject};
use crate::connection::ObjectFactory;
use crate::error::{Error, Result};

/// Thread-safe registry of remote objects by GUID.
#[derive(Default)]
pub struct ObjectStore {
	objects: DashMap<Arc<str>, Arc<dyn ChannelOwner>>,
}

impl ObjectStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the proxy for a newly announced object and registers it.
	///
	/// The concrete proxy is chosen by `factory` from the channel's type;
	/// unknown types become an [`OpaqueObject`]. Non-null `params` are applied
	/// immediately; `null` leaves the object waiting for `__init__`.
	pub fn materialize(
		&self,
		factory: Option<&dyn ObjectFactory>,
		channel: Channel,
		params: &Value,
	) -> Result<Arc<dyn ChannelOwner>> {
		let guid: Arc<str> = Arc::from(channel.guid());
		if self.objects.contains_key(&guid) {
			return Err(Error::ProtocolInvariant(format!(
				"duplicate creation of live object {guid}"
			)));
		}

		let object = match factory.and_then(|factory| factory.create_object(channel.clone())) {
			Some(object) => object,
			None => {
				tracing::debug!(
					guid = %guid,
					type_name = %channel.type_name(),
					"unmodeled object type, registering opaque handle"
				);
				Arc::new(OpaqueObject::new(channel))
			}
		};

		if !params.is_null() {
			object.initialize(params, self)?;
		}

		match self.objects.entry(guid) {
			Entry::Occupied(entry) => Err(Error::ProtocolInvariant(format!(
				"duplicate creation of live object {}",
				entry.key()
			))),
			Entry::Vacant(entry) => Ok(entry.insert(object).value().clone()),
		}
	}

	/// Applies deferred construction params (`__init__`).
	pub fn initialize(&self, guid: &str, params: &Value) -> Result<()> {
		self.resolve(guid)?.initialize(params, self)
	}

	/// Looks up a live object. A missing guid is a protocol violation.
	pub fn resolve(&self, guid: &str) -> Result<Arc<dyn ChannelOwner>> {
		self.try_get(guid).ok_or_else(|| {
			Error::ProtocolInvariant(format!("reference to unknown object {guid}"))
		})
	}

	/// Looks up a live object and downcasts it to the proxy type `T`.
	pub fn resolve_as<T: ChannelOwner + Clone>(&self, guid: &str) -> Result<T> {
		let object = self.resolve(guid)?;
		object.downcast_ref::<T>().cloned().ok_or_else(|| {
			Error::UnexpectedResult(format!(
				"object {guid} is a {}, expected {}",
				object.type_name(),
				std::any::type_name::<T>()
			))
		})
	}

	/// Lookup that tolerates absence (for proxies reading retired relations).
	pub fn try_get(&self, guid: &str) -> Option<Arc<dyn ChannelOwner>> {
		self.objects.get(guid).map(|entry| entry.value().clone())
	}

	pub fn get_as<T: ChannelOwner + Clone>(&self, guid: &str) -> Option<T> {
		self.try_get(guid)?.downcast_ref::<T>().cloned()
	}

	/// Replaces a guid-shaped value with the registered proxy.
	pub fn resolve_payload(&self, value: Value) -> Result<Payload> {
		match guid_ref(&value) {
			Some(guid) => self.resolve(guid).map(Payload::Object),
			None => Ok(Payload::Value(value)),
		}
	}

	/// Removes an object and marks its channel disposed.
	///
	/// Proxies still held elsewhere stay valid values but fail every further
	/// call with `ObjectDisposed`.
	pub fn retire(&self, guid: &str) -> Result<Arc<dyn ChannelOwner>> {
		let (_, object) = self.objects.remove(guid).ok_or_else(|| {
			Error::ProtocolInvariant(format!("disposal of unknown object {guid}"))
		})?;
		object.channel().mark_disposed();
		Ok(object)
	}

	/// Drops every entry without marking channels disposed; used when the
	/// connection closes so retained proxies report `ConnectionClosed`.
	pub(crate) fn clear(&self) {
		self.objects.clear();
	}

	pub fn contains(&self, guid: &str) -> bool {
		self.objects.contains_key(guid)
	}

	pub fn len(&self) -> usize {
		self.objects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.objects.is_empty()
	}

	/// Guids of all live objects, in no particular order.
	pub fn guids(&self) -> Vec<Arc<str>> {
		self.objects.iter().map(|entry| entry.key().clone()).collect()
	}
}
