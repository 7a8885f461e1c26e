//! [`Browser`] proxy.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use pwire_runtime::channel_owner::private;
use pwire_runtime::{Channel, ChannelOwner, ChannelOwnerImpl, ObjectStore, Payload, Result};
use serde_json::Value;

use crate::options::{ContextOptions, WithOptions};
use crate::related::{lookup_all, remove_guid};
use crate::{BrowserContext, Page};

/// A launched browser instance.
#[derive(Clone)]
pub struct Browser {
	base: ChannelOwnerImpl,
	/// Open contexts, in creation order.
	contexts: Arc<Mutex<Vec<Arc<str>>>>,
}

impl Browser {
	pub const TYPE_NAME: &'static str = "browser";

	pub fn new(channel: Channel) -> Self {
		Self {
			base: ChannelOwnerImpl::new(channel),
			contexts: Arc::new(Mutex::new(Vec::new())),
		}
	}

	/// Contexts the engine has reported open.
	pub fn contexts(&self) -> Vec<BrowserContext> {
		let guids = self.contexts.lock().clone();
		lookup_all(self.channel(), &guids)
	}

	/// Creates an isolated browser context.
	pub async fn new_context(&self, options: Option<&ContextOptions>) -> Result<BrowserContext> {
		self.channel()
			.send_object("newContext", WithOptions::new(options))
			.await
	}

	/// Creates a page in a fresh context of its own.
	pub async fn new_page(&self, options: Option<&ContextOptions>) -> Result<Page> {
		self.channel()
			.send_object("newPage", WithOptions::new(options))
			.await
	}

	pub async fn close(&self) -> Result<()> {
		self.channel().send_no_result("close", ()).await
	}
}

impl private::Sealed for Browser {}

impl ChannelOwner for Browser {
	fn channel(&self) -> &Channel {
		self.base.channel()
	}

	fn initialize(&self, params: &Value, _objects: &ObjectStore) -> Result<()> {
		self.base.set_initializer(params);
		Ok(())
	}

	fn on_event(&self, method: &str, payload: &Payload) {
		match (method, payload.guid()) {
			("contextCreated", Some(guid)) => self.contexts.lock().push(Arc::from(guid)),
			("contextClosed", Some(guid)) => remove_guid(&mut self.contexts.lock(), guid),
			_ => self.base.on_event(method, payload),
		}
	}
}

impl fmt::Debug for Browser {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Browser")
			.field("guid", &self.guid())
			.field("contexts", &self.contexts.lock().len())
			.finish()
	}
}
