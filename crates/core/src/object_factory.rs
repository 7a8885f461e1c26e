//! Object factory: maps protocol type names to proxy constructors.
//!
//! When the engine announces an object with `__create__`, the connection asks
//! this factory for the proxy matching the declared type. Types not listed
//! here fall back to an opaque proxy inside the runtime.

use std::sync::Arc;

use pwire_runtime::{Channel, ChannelOwner, ObjectFactory};

use crate::{Browser, BrowserContext, BrowserType, ElementHandle, Frame, Page};

/// Factory for the proxies of this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PwireFactory;

impl ObjectFactory for PwireFactory {
	fn create_object(&self, channel: Channel) -> Option<Arc<dyn ChannelOwner>> {
		let object: Arc<dyn ChannelOwner> = match channel.type_name() {
			BrowserType::TYPE_NAME => Arc::new(BrowserType::new(channel)),
			Browser::TYPE_NAME => Arc::new(Browser::new(channel)),
			BrowserContext::TYPE_NAME => Arc::new(BrowserContext::new(channel)),
			Page::TYPE_NAME => Arc::new(Page::new(channel)),
			Frame::TYPE_NAME => Arc::new(Frame::new(channel)),
			ElementHandle::TYPE_NAME => Arc::new(ElementHandle::new(channel)),
			_ => return None,
		};
		Some(object)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pwire_runtime::{Connection, ConnectionLike};
	use std::sync::Weak;

	fn channel(type_name: &str) -> Channel {
		let connection: Weak<dyn ConnectionLike> = Weak::<Connection>::new();
		Channel::new(Arc::from("obj@1"), Arc::from(type_name), connection)
	}

	#[test]
	fn test_known_types() {
		let factory = PwireFactory;
		let page = factory.create_object(channel("page")).unwrap();
		assert!(page.downcast_ref::<Page>().is_some());

		let element = factory.create_object(channel("elementHandle")).unwrap();
		assert!(element.downcast_ref::<ElementHandle>().is_some());
		assert!(element.downcast_ref::<Frame>().is_none());
	}

	#[test]
	fn test_unknown_type_is_left_to_the_runtime() {
		assert!(PwireFactory.create_object(channel("worker")).is_none());
	}
}
