//! [`BrowserType`] - entry point for one engine variant.

use std::fmt;

use pwire_runtime::channel_owner::private;
use pwire_runtime::{Channel, ChannelOwner, ChannelOwnerImpl, ObjectStore, Payload, Result};
use serde_json::Value;

use crate::Browser;
use crate::options::{LaunchOptions, WithOptions};

/// Launcher for one browser engine (`chromium`, `firefox` or `webkit`).
///
/// The three roots are registered locally when the connection starts, so
/// they can be addressed before the engine has announced anything.
#[derive(Clone)]
pub struct BrowserType {
	base: ChannelOwnerImpl,
}

impl BrowserType {
	pub const TYPE_NAME: &'static str = "browserType";

	pub fn new(channel: Channel) -> Self {
		Self {
			base: ChannelOwnerImpl::new(channel),
		}
	}

	/// Engine name. Defaults to the guid for locally bootstrapped roots.
	pub fn name(&self) -> String {
		match self.base.initializer().get("name").and_then(Value::as_str) {
			Some(name) => name.to_string(),
			None => self.base.guid().to_string(),
		}
	}

	/// Launches a browser.
	///
	/// # Errors
	///
	/// Returns the engine's error if the browser cannot be started, or
	/// `UnexpectedResult` if the result is not a browser.
	pub async fn launch(&self, options: Option<&LaunchOptions>) -> Result<Browser> {
		tracing::debug!(browser_type = %self.name(), "launching browser");
		self.channel()
			.send_object("launch", WithOptions::new(options))
			.await
	}
}

impl private::Sealed for BrowserType {}

impl ChannelOwner for BrowserType {
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

impl fmt::Debug for BrowserType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BrowserType")
			.field("guid", &self.guid())
			.field("name", &self.name())
			.finish()
	}
}
