//! Guid handles to related proxies.
//!
//! Proxies never own each other. They keep the guids the engine told them
//! about and resolve them through the registry on access, so a retired
//! relation reads as absent.

use std::sync::Arc;

use pwire_runtime::{Channel, ChannelOwner, Error, ObjectStore, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Resolves `guid` to a live `T`, or `None` if it was retired or the
/// connection is gone.
pub(crate) fn lookup<T: ChannelOwner + Clone>(channel: &Channel, guid: &str) -> Option<T> {
	channel.connection().ok()?.objects().get_as::<T>(guid)
}

/// Resolves every live `T` among `guids`, keeping their order.
pub(crate) fn lookup_all<T: ChannelOwner + Clone>(channel: &Channel, guids: &[Arc<str>]) -> Vec<T> {
	let Ok(connection) = channel.connection() else {
		return Vec::new();
	};
	let objects = connection.objects();
	guids.iter().filter_map(|guid| objects.get_as::<T>(guid)).collect()
}

/// Checks that a guid named in construction params is registered.
pub(crate) fn require(objects: &ObjectStore, guid: &str) -> Result<Arc<str>> {
	objects.resolve(guid)?;
	Ok(Arc::from(guid))
}

pub(crate) fn require_opt(objects: &ObjectStore, guid: Option<&str>) -> Result<Option<Arc<str>>> {
	guid.map(|guid| require(objects, guid)).transpose()
}

pub(crate) fn require_all(objects: &ObjectStore, guids: &[String]) -> Result<Vec<Arc<str>>> {
	guids.iter().map(|guid| require(objects, guid)).collect()
}

/// Parses construction params; `null` yields the defaults.
pub(crate) fn parse_initializer<T: DeserializeOwned + Default>(params: &Value) -> Result<T> {
	if params.is_null() {
		return Ok(T::default());
	}
	T::deserialize(params)
		.map_err(|e| Error::ProtocolInvariant(format!("malformed initializer: {e}")))
}

pub(crate) fn remove_guid(guids: &mut Vec<Arc<str>>, guid: &str) {
	guids.retain(|g| &**g != guid);
}
