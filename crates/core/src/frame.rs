//! [`Frame`] proxy: one document in a page's frame tree.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use pwire_runtime::channel_owner::private;
use pwire_runtime::{Channel, ChannelOwner, ChannelOwnerImpl, ObjectStore, Payload, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::Page;
use crate::events::PageEvent;
use crate::related::{lookup, lookup_all, parse_initializer, remove_guid, require_all, require_opt};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameInit {
	page_guid: Option<String>,
	#[serde(default)]
	name: String,
	#[serde(default)]
	url: String,
	#[serde(default)]
	is_detached: bool,
	parent_frame_guid: Option<String>,
	#[serde(default)]
	child_frame_guids: Vec<String>,
}

#[derive(Default)]
struct FrameState {
	page: Option<Arc<str>>,
	name: String,
	url: String,
	is_detached: bool,
	parent: Option<Arc<str>>,
	children: Vec<Arc<str>>,
}

/// A frame within a [`Page`].
#[derive(Clone)]
pub struct Frame {
	base: ChannelOwnerImpl,
	state: Arc<Mutex<FrameState>>,
}

impl Frame {
	pub const TYPE_NAME: &'static str = "frame";

	pub fn new(channel: Channel) -> Self {
		Self {
			base: ChannelOwnerImpl::new(channel),
			state: Arc::new(Mutex::new(FrameState::default())),
		}
	}

	/// The frame's `name` attribute.
	pub fn name(&self) -> String {
		self.state.lock().name.clone()
	}

	/// URL of the last committed navigation.
	pub fn url(&self) -> String {
		self.state.lock().url.clone()
	}

	pub fn is_detached(&self) -> bool {
		self.state.lock().is_detached
	}

	pub fn page(&self) -> Option<Page> {
		let guid = self.state.lock().page.clone()?;
		lookup(self.channel(), &guid)
	}

	/// `None` for a main frame.
	pub fn parent_frame(&self) -> Option<Frame> {
		let guid = self.state.lock().parent.clone()?;
		lookup(self.channel(), &guid)
	}

	pub fn child_frames(&self) -> Vec<Frame> {
		let guids = self.state.lock().children.clone();
		lookup_all(self.channel(), &guids)
	}

	fn on_navigated(&self, payload: &Payload) {
		// Engines send either the bare url or `{"url": ...}`.
		let url = match payload.as_value() {
			Some(Value::String(url)) => url.clone(),
			Some(value) => match value.get("url").and_then(Value::as_str) {
				Some(url) => url.to_string(),
				None => {
					tracing::warn!(guid = %self.guid(), %value, "frameNavigated without url");
					return;
				}
			},
			None => return,
		};

		let page = {
			let mut state = self.state.lock();
			state.url = url;
			state.page.clone()
		};
		if let Some(page) = page.and_then(|guid| lookup::<Page>(self.channel(), &guid)) {
			page.emit(PageEvent::FrameNavigated(self.clone()));
		}
	}
}

impl private::Sealed for Frame {}

impl ChannelOwner for Frame {
	fn channel(&self) -> &Channel {
		self.base.channel()
	}

	fn initialize(&self, params: &Value, objects: &ObjectStore) -> Result<()> {
		let init: FrameInit = parse_initializer(params)?;
		let page = require_opt(objects, init.page_guid.as_deref())?;
		let parent = require_opt(objects, init.parent_frame_guid.as_deref())?;
		let children = require_all(objects, &init.child_frame_guids)?;

		*self.state.lock() = FrameState {
			page,
			name: init.name,
			url: init.url,
			is_detached: init.is_detached,
			parent,
			children,
		};
		self.base.set_initializer(params);
		Ok(())
	}

	fn on_event(&self, method: &str, payload: &Payload) {
		match (method, payload.guid()) {
			("frameNavigated", _) => self.on_navigated(payload),
			("frameAttached", Some(guid)) => self.state.lock().children.push(Arc::from(guid)),
			("frameDetached", Some(guid)) => remove_guid(&mut self.state.lock().children, guid),
			_ => self.base.on_event(method, payload),
		}
	}
}

impl fmt::Debug for Frame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("Frame")
			.field("guid", &self.guid())
			.field("name", &state.name)
			.field("url", &state.url)
			.field("detached", &state.is_detached)
			.finish()
	}
}
