//! Proxy-level event streams.
//!
//! Proxies publish typed events ([`PageEvent`], [`ContextEvent`]) after their
//! own state has been updated for the underlying protocol event:
//!
//! - [`EventBus`] - broadcast sender plus predicate-based one-shot waiters
//! - [`EventStream`] - [`broadcast::Receiver`] wrapper that rides over lag
//! - [`EventWaiter`] - one matching event, with an optional timeout
//!
//! [`broadcast::Receiver`]: tokio::sync::broadcast::Receiver

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use pwire_runtime::{ChannelOwner, Error, Result};
use tokio::sync::{broadcast, oneshot};

use crate::{Frame, Page};

/// Broadcast capacity for proxy event buses.
pub(crate) const EVENT_CAPACITY: usize = 64;

/// Events published by a [`Page`].
#[derive(Clone)]
pub enum PageEvent {
	/// The page was closed.
	Close,
	/// One of the page's frames committed a navigation.
	FrameNavigated(Frame),
}

impl fmt::Debug for PageEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PageEvent::Close => f.write_str("Close"),
			PageEvent::FrameNavigated(frame) => f
				.debug_struct("FrameNavigated")
				.field("frame", &frame.guid())
				.field("url", &frame.url())
				.finish(),
		}
	}
}

/// Events published by a [`BrowserContext`](crate::BrowserContext).
#[derive(Clone)]
pub enum ContextEvent {
	/// A page was opened in the context.
	Page(Page),
	/// The context was closed.
	Close,
}

impl fmt::Debug for ContextEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ContextEvent::Page(page) => f.debug_tuple("Page").field(&page.guid()).finish(),
			ContextEvent::Close => f.write_str("Close"),
		}
	}
}

struct WaiterEntry<E> {
	predicate: Box<dyn Fn(&E) -> bool + Send + Sync>,
	complete_tx: oneshot::Sender<E>,
}

/// Broadcast channel combined with predicate-based waiters.
///
/// Waiters are checked first during [`emit`](Self::emit), so a `wait_for_*`
/// caller gets its event even when stream subscribers are lagging.
pub(crate) struct EventBus<E: Clone + Send + 'static> {
	tx: broadcast::Sender<E>,
	waiters: Mutex<Vec<WaiterEntry<E>>>,
}

impl<E: Clone + Send + 'static> EventBus<E> {
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity);
		Self {
			tx,
			waiters: Mutex::new(Vec::new()),
		}
	}

	/// Delivers `event` to matching waiters, then to all subscribers.
	pub fn emit(&self, event: E) {
		{
			let mut waiters = self.waiters.lock();
			let mut i = 0;
			while i < waiters.len() {
				if waiters[i].complete_tx.is_closed() {
					waiters.swap_remove(i);
				} else if (waiters[i].predicate)(&event) {
					let entry = waiters.swap_remove(i);
					let _ = entry.complete_tx.send(event.clone());
				} else {
					i += 1;
				}
			}
		}
		// No subscribers is not an error.
		let _ = self.tx.send(event);
	}

	/// Events emitted before this call are not received.
	pub fn subscribe(&self) -> EventStream<E> {
		EventStream::new(self.tx.subscribe())
	}

	pub fn register_waiter<F>(&self, predicate: F, timeout: Option<Duration>) -> EventWaiter<E>
	where
		F: Fn(&E) -> bool + Send + Sync + 'static,
	{
		let (complete_tx, complete_rx) = oneshot::channel();
		self.waiters.lock().push(WaiterEntry {
			predicate: Box::new(predicate),
			complete_tx,
		});
		EventWaiter {
			rx: complete_rx,
			timeout,
		}
	}

	#[cfg(test)]
	pub fn waiter_count(&self) -> usize {
		self.waiters.lock().len()
	}
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
	fn default() -> Self {
		Self::new(EVENT_CAPACITY)
	}
}

/// Receiver for a proxy's events.
///
/// Lag is logged and skipped instead of surfacing as an error.
pub struct EventStream<E: Clone + Send + 'static> {
	rx: broadcast::Receiver<E>,
}

impl<E: Clone + Send + 'static> EventStream<E> {
	pub(crate) fn new(rx: broadcast::Receiver<E>) -> Self {
		Self { rx }
	}

	/// Receives the next event. `None` once the publishing proxy is gone.
	pub async fn recv(&mut self) -> Option<E> {
		loop {
			match self.rx.recv().await {
				Ok(event) => return Some(event),
				Err(broadcast::error::RecvError::Lagged(n)) => {
					tracing::warn!(dropped = n, "Event stream lagged, dropped events");
				}
				Err(broadcast::error::RecvError::Closed) => return None,
			}
		}
	}

	/// Returns an event if one is immediately available.
	pub fn try_recv(&mut self) -> Option<E> {
		loop {
			match self.rx.try_recv() {
				Ok(event) => return Some(event),
				Err(broadcast::error::TryRecvError::Lagged(n)) => {
					tracing::warn!(dropped = n, "Event stream lagged, dropped events");
				}
				Err(
					broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
				) => return None,
			}
		}
	}
}

/// One-shot wait for the first event matching a predicate.
pub struct EventWaiter<E> {
	rx: oneshot::Receiver<E>,
	timeout: Option<Duration>,
}

impl<E: Send + 'static> EventWaiter<E> {
	/// Waits for the event, honoring the timeout it was created with.
	///
	/// # Errors
	///
	/// - [`Error::Timeout`] if no matching event arrives in time
	/// - [`Error::ConnectionClosed`] if the publishing proxy is dropped
	pub async fn wait(self) -> Result<E> {
		match self.timeout {
			Some(timeout) => tokio::time::timeout(timeout, self.rx)
				.await
				.map_err(|_| {
					Error::Timeout(format!(
						"no matching event within {}ms",
						timeout.as_millis()
					))
				})?
				.map_err(|_| source_dropped()),
			None => self.rx.await.map_err(|_| source_dropped()),
		}
	}
}

impl<E: Send + 'static> Future for EventWaiter<E> {
	type Output = Result<E>;

	/// Polls without the timeout. Use [`wait`](Self::wait) to honor it.
	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.rx)
			.poll(cx)
			.map(|received| received.map_err(|_| source_dropped()))
	}
}

fn source_dropped() -> Error {
	Error::ConnectionClosed("event source dropped".to_string())
}
