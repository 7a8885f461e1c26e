//! [`BrowserContext`] proxy: an isolated browser session.

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
use serde_json::Value;

use crate::events::{ContextEvent, EventBus, EventStream};
use crate::related::{lookup, lookup_all, parse_initializer, remove_guid, require_opt};
use crate::{Browser, Page};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextInit {
	browser_guid: Option<String>,
}

#[derive(Default)]
struct ContextState {
	browser: Option<Arc<str>>,
	/// Open pages, in creation order.
	pages: Vec<Arc<str>>,
}

/// Isolated browser session with its own pages, cookies and storage.
///
/// # Example
///
/// ```ignore
/// let context = browser.new_context(None).await?;
/// let mut events = context.subscribe();
/// let page = context.new_page().await?;
/// assert_eq!(context.pages().len(), 1);
/// context.close().await?;
/// ```
#[derive(Clone)]
pub struct BrowserContext {
	base: ChannelOwnerImpl,
	state: Arc<Mutex<ContextState>>,
	events: Arc<EventBus<ContextEvent>>,
}

impl BrowserContext {
	pub const TYPE_NAME: &'static str = "context";

	pub fn new(channel: Channel) -> Self {
		Self {
			base: ChannelOwnerImpl::new(channel),
			state: Arc::new(Mutex::new(ContextState::default())),
			events: Arc::new(EventBus::default()),
		}
	}

	/// Owning browser, if it is still alive.
	pub fn browser(&self) -> Option<Browser> {
		let guid = self.state.lock().browser.clone()?;
		lookup(self.channel(), &guid)
	}

	/// Pages the engine has reported open in this context.
	pub fn pages(&self) -> Vec<Page> {
		let guids = self.state.lock().pages.clone();
		lookup_all(self.channel(), &guids)
	}

	pub async fn new_page(&self) -> Result<Page> {
		self.channel().send_object("newPage", ()).await
	}

	pub async fn close(&self) -> Result<()> {
		self.channel().send_no_result("close", ()).await
	}

	/// Stream of [`ContextEvent`]s published from now on.
	pub fn subscribe(&self) -> EventStream<ContextEvent> {
		self.events.subscribe()
	}

	/// Waits for the next page opened in this context.
	///
	/// The waiter is registered when this is called, so a page created before
	/// the returned future is first polled is still seen.
	pub fn wait_for_page(
		&self,
		timeout: Option<Duration>,
	) -> impl Future<Output = Result<Page>> + Send + 'static {
		let waiter = self.events.register_waiter(
			|event| matches!(event, ContextEvent::Page(_) | ContextEvent::Close),
			timeout,
		);
		async move {
			match waiter.wait().await? {
				ContextEvent::Page(page) => Ok(page),
				ContextEvent::Close => Err(Error::UnexpectedResult(
					"context closed while waiting for a page".to_string(),
				)),
			}
		}
	}
}

impl private::Sealed for BrowserContext {}

impl ChannelOwner for BrowserContext {
	fn channel(&self) -> &Channel {
		self.base.channel()
	}

	fn initialize(&self, params: &Value, objects: &ObjectStore) -> Result<()> {
		let init: ContextInit = parse_initializer(params)?;
		let browser = require_opt(objects, init.browser_guid.as_deref())?;

		self.state.lock().browser = browser;
		self.base.set_initializer(params);
		Ok(())
	}

	fn on_event(&self, method: &str, payload: &Payload) {
		match method {
			"pageCreated" => {
				let Some(page) = payload.downcast::<Page>() else {
					tracing::warn!(guid = %self.guid(), ?payload, "pageCreated without a page");
					return;
				};
				self.state.lock().pages.push(Arc::from(page.guid()));
				self.events.emit(ContextEvent::Page(page));
			}
			"pageClosed" => {
				if let Some(guid) = payload.guid() {
					remove_guid(&mut self.state.lock().pages, guid);
				}
			}
			"close" => self.events.emit(ContextEvent::Close),
			_ => self.base.on_event(method, payload),
		}
	}
}

impl fmt::Debug for BrowserContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BrowserContext")
			.field("guid", &self.guid())
			.field("pages", &self.state.lock().pages.len())
			.finish()
	}
}
