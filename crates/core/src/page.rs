//! [`Page`] proxy representing a browser tab.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pwire_runtime::channel_owner::private;
use pwire_runtime::{
	Channel, ChannelOwner, ChannelOwnerImpl, Error, ObjectStore, Payload, Result,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::events::{EventBus, EventStream, PageEvent};
use crate::options::{ClickOptions, CloseOptions, GotoOptions, ScreenshotOptions, WithOptions};
use crate::related::{lookup, lookup_all, parse_initializer, remove_guid, require_all, require_opt};
use crate::{BrowserContext, ElementHandle, Frame};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInit {
	context_guid: Option<String>,
	main_frame_guid: Option<String>,
	#[serde(default)]
	frame_guids: Vec<String>,
}

#[derive(Default)]
struct PageState {
	context: Option<Arc<str>>,
	main_frame: Option<Arc<str>>,
	/// Attached frames, main frame included, in attach order.
	frames: Vec<Arc<str>>,
}

/// A browser tab or window within a [`BrowserContext`].
#[derive(Clone)]
pub struct Page {
	base: ChannelOwnerImpl,
	state: Arc<Mutex<PageState>>,
	events: Arc<EventBus<PageEvent>>,
}

impl Page {
	pub const TYPE_NAME: &'static str = "page";

	pub fn new(channel: Channel) -> Self {
		Self {
			base: ChannelOwnerImpl::new(channel),
			state: Arc::new(Mutex::new(PageState::default())),
			events: Arc::new(EventBus::default()),
		}
	}

	pub fn context(&self) -> Option<BrowserContext> {
		let guid = self.state.lock().context.clone()?;
		lookup(self.channel(), &guid)
	}

	pub fn main_frame(&self) -> Option<Frame> {
		let guid = self.state.lock().main_frame.clone()?;
		lookup(self.channel(), &guid)
	}

	/// All attached frames.
	pub fn frames(&self) -> Vec<Frame> {
		let guids = self.state.lock().frames.clone();
		lookup_all(self.channel(), &guids)
	}

	/// URL of the main frame, or `about:blank` before it is known.
	pub fn url(&self) -> String {
		self.main_frame()
			.map(|frame| frame.url())
			.unwrap_or_else(|| "about:blank".to_string())
	}

	/// Timeout applied to every call made through this page.
	pub fn set_default_timeout(&self, timeout: Option<Duration>) {
		self.channel().set_timeout(timeout);
	}

	pub async fn goto(&self, url: &str, options: Option<&GotoOptions>) -> Result<()> {
		self.channel()
			.send_no_result("goto", json!({ "url": url, "options": options }))
			.await
	}

	pub async fn click(&self, selector: &str, options: Option<&ClickOptions>) -> Result<()> {
		self.channel()
			.send_no_result("click", json!({ "selector": selector, "options": options }))
			.await
	}

	/// First element matching `selector`, or `None` if nothing matches.
	pub async fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>> {
		self.channel()
			.send_optional_object("querySelector", json!({ "selector": selector }))
			.await
	}

	/// Captures a screenshot. The engine writes it to `options.path` when set.
	pub async fn screenshot(&self, options: Option<&ScreenshotOptions>) -> Result<()> {
		self.channel()
			.send_no_result("screenshot", WithOptions::new(options))
			.await
	}

	pub async fn title(&self) -> Result<String> {
		self.channel().send("title", ()).await
	}

	pub async fn close(&self, options: Option<&CloseOptions>) -> Result<()> {
		self.channel()
			.send_no_result("close", WithOptions::new(options))
			.await
	}

	/// Stream of [`PageEvent`]s published from now on.
	pub fn subscribe(&self) -> EventStream<PageEvent> {
		self.events.subscribe()
	}

	/// Waits for the next navigation of any frame of this page.
	///
	/// Registered when called, like
	/// [`BrowserContext::wait_for_page`](crate::BrowserContext::wait_for_page).
	pub fn wait_for_navigation(
		&self,
		timeout: Option<Duration>,
	) -> impl Future<Output = Result<Frame>> + Send + 'static {
		let waiter = self.events.register_waiter(
			|event| matches!(event, PageEvent::FrameNavigated(_) | PageEvent::Close),
			timeout,
		);
		async move {
			match waiter.wait().await? {
				PageEvent::FrameNavigated(frame) => Ok(frame),
				PageEvent::Close => Err(Error::UnexpectedResult(
					"page closed while waiting for navigation".to_string(),
				)),
			}
		}
	}

	pub(crate) fn emit(&self, event: PageEvent) {
		self.events.emit(event);
	}
}

impl private::Sealed for Page {}

impl ChannelOwner for Page {
	fn channel(&self) -> &Channel {
		self.base.channel()
	}

	fn initialize(&self, params: &Value, objects: &ObjectStore) -> Result<()> {
		let init: PageInit = parse_initializer(params)?;
		let context = require_opt(objects, init.context_guid.as_deref())?;
		let main_frame = require_opt(objects, init.main_frame_guid.as_deref())?;
		let frames = require_all(objects, &init.frame_guids)?;

		let mut state = self.state.lock();
		state.context = context;
		state.main_frame = main_frame;
		state.frames = frames;
		drop(state);

		self.base.set_initializer(params);
		Ok(())
	}

	fn on_event(&self, method: &str, payload: &Payload) {
		match (method, payload.guid()) {
			("frameAttached", Some(guid)) => self.state.lock().frames.push(Arc::from(guid)),
			("frameDetached", Some(guid)) => remove_guid(&mut self.state.lock().frames, guid),
			("close", _) => self.events.emit(PageEvent::Close),
			_ => self.base.on_event(method, payload),
		}
	}
}

impl fmt::Debug for Page {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Page")
			.field("guid", &self.guid())
			.field("frames", &self.state.lock().frames.len())
			.finish()
	}
}
