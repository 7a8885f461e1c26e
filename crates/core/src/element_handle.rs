//! [`ElementHandle`] proxy.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use pwire_runtime::channel_owner::private;
use pwire_runtime::{Channel, ChannelOwner, ChannelOwnerImpl, ObjectStore, Payload, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::Frame;
use crate::options::{ClickOptions, WithOptions};
use crate::related::{lookup, parse_initializer, require_opt};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementInit {
	frame_guid: Option<String>,
}

/// Reference to a DOM element held by the engine.
#[derive(Clone)]
pub struct ElementHandle {
	base: ChannelOwnerImpl,
	frame: Arc<Mutex<Option<Arc<str>>>>,
}

impl ElementHandle {
	pub const TYPE_NAME: &'static str = "elementHandle";

	pub fn new(channel: Channel) -> Self {
		Self {
			base: ChannelOwnerImpl::new(channel),
			frame: Arc::new(Mutex::new(None)),
		}
	}

	/// Frame the element lives in.
	pub fn frame(&self) -> Option<Frame> {
		let guid = self.frame.lock().clone()?;
		lookup(self.channel(), &guid)
	}

	pub async fn click(&self, options: Option<&ClickOptions>) -> Result<()> {
		self.channel()
			.send_no_result("click", WithOptions::new(options))
			.await
	}

	/// The element's `textContent`; `None` for nodes without one.
	pub async fn text_content(&self) -> Result<Option<String>> {
		self.channel().send("textContent", ()).await
	}
}

impl private::Sealed for ElementHandle {}

impl ChannelOwner for ElementHandle {
	fn channel(&self) -> &Channel {
		self.base.channel()
	}

	fn initialize(&self, params: &Value, objects: &ObjectStore) -> Result<()> {
		let init: ElementInit = parse_initializer(params)?;
		*self.frame.lock() = require_opt(objects, init.frame_guid.as_deref())?;
		self.base.set_initializer(params);
		Ok(())
	}

	fn on_event(&self, method: &str, payload: &Payload) {
		self.base.on_event(method, payload);
	}
}

impl fmt::Debug for ElementHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ElementHandle")
			.field("guid", &self.guid())
			.finish()
	}
}
