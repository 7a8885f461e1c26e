//! Connection - request/response correlation and event dispatch.
//!
//! The connection owns the transport, the [`PendingCalls`] table and the
//! [`ObjectStore`]. Callers on any task issue requests through
//! [`Connection::send_message`]; a single dispatch loop ([`Connection::run`])
//! reads every inbound frame and performs all registry mutation and call
//! resolution.
//!
//! # Message Flow
//!
//! 1. A proxy calls `Channel::call()` with a method and params
//! 2. The connection allocates an id and a pending slot, encodes the request
//!    and queues the frame for the writer task
//! 3. The caller awaits the [`PendingResult`]
//! 4. The dispatch loop reads the response, replaces a guid-shaped result
//!    with the registered proxy and fulfils the slot
//!
//! # Lifecycle
//!
//! `Open` → `Closing` → `Closed`, one way only. End of stream, a framing
//! error, a protocol violation, a write failure or [`Connection::terminate`]
//! all close the connection; pending calls are then drained with
//! `ConnectionClosed`.

mod object_store;
mod pending;

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use pwire_protocol::{
	CREATE_METHOD, DISPOSE_METHOD, Event, INIT_METHOD, Message, Request, Response, encode_frame,
};
use serde_json::Value;
use tokio::sync::{Notify, mpsc, watch};

pub use object_store::ObjectStore;
pub use pending::{PendingCalls, PendingResult};

use crate::channel::Channel;
use crate::channel_owner::ChannelOwner;
use crate::error::{Error, Result};
use crate::transport::{FrameReceiver, FrameSender, PipeTransport};

/// Interface that channels need from their connection.
pub trait ConnectionLike: Send + Sync {
	/// Issues a request and returns its pending result without waiting.
	fn send_message(&self, guid: &str, method: &str, params: Value) -> Result<PendingResult>;

	/// The object registry.
	fn objects(&self) -> &ObjectStore;
}

/// Factory for typed proxies.
///
/// Decouples the connection from concrete proxy types; the proxy crate
/// implements it and installs it with [`Connection::set_factory`].
pub trait ObjectFactory: Send + Sync {
	/// Builds the proxy for `channel.type_name()`, or `None` for types the
	/// factory does not model.
	fn create_object(&self, channel: Channel) -> Option<Arc<dyn ChannelOwner>>;
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Open,
	Closing,
	Closed,
}

struct Io {
	sender: FrameSender,
	receiver: FrameReceiver,
	outbound_rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// Connection to the automation engine.
pub struct Connection {
	pending: PendingCalls,
	objects: ObjectStore,
	/// Encoded frames for the writer task
	outbound_tx: mpsc::UnboundedSender<Vec<u8>>,
	/// Transport halves, taken by `run()`
	io: Mutex<Option<Io>>,
	factory: RwLock<Option<Arc<dyn ObjectFactory>>>,
	state: watch::Sender<ConnectionState>,
	shutdown: Notify,
	weak_self: Weak<Connection>,
}

impl Connection {
	/// Creates a connection over `transport`. Nothing is read until
	/// [`run`](Self::run) is awaited; requests issued earlier are queued.
	pub fn new(transport: PipeTransport) -> Arc<Self> {
		let (sender, receiver) = transport.into_parts();
		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
		let (state, _) = watch::channel(ConnectionState::Open);

		Arc::new_cyclic(|weak_self| Self {
			pending: PendingCalls::new(),
			objects: ObjectStore::new(),
			outbound_tx,
			io: Mutex::new(Some(Io {
				sender,
				receiver,
				outbound_rx,
			})),
			factory: RwLock::new(None),
			state,
			shutdown: Notify::new(),
			weak_self: weak_self.clone(),
		})
	}

	/// Installs the proxy factory. Objects created before this are opaque.
	pub fn set_factory(&self, factory: Arc<dyn ObjectFactory>) {
		*self.factory.write() = Some(factory);
	}

	/// Registers a root object locally, without a round trip, so the caller
	/// has something to address the first request to.
	pub fn bootstrap(&self, type_name: &str, guid: &str) -> Result<Arc<dyn ChannelOwner>> {
		let object = self.materialize(type_name, Arc::from(guid), &Value::Null)?;
		tracing::debug!(guid, type_name, "bootstrapped root object");
		Ok(object)
	}

	/// The object registry.
	pub fn objects(&self) -> &ObjectStore {
		&self.objects
	}

	/// Number of issued calls still awaiting a response.
	pub fn pending_count(&self) -> usize {
		self.pending.len()
	}

	pub fn state(&self) -> ConnectionState {
		*self.state.borrow()
	}

	/// Waits until the connection reaches `Closed`.
	pub async fn closed(&self) {
		let mut state = self.state.subscribe();
		let _ = state
			.wait_for(|state| *state == ConnectionState::Closed)
			.await;
	}

	/// Issues a request to `guid` and returns its pending result immediately.
	pub fn send_message(&self, guid: &str, method: &str, params: Value) -> Result<PendingResult> {
		let (id, pending) = self.pending.register()?;

		let request = Request {
			id,
			guid: Arc::from(guid),
			method: method.to_string(),
			params,
		};
		let frame = match encode_frame(&request) {
			Ok(frame) => frame,
			Err(e) => {
				self.pending.forget(id);
				return Err(e.into());
			}
		};

		tracing::debug!(id, guid, method, "sending request");

		if self.outbound_tx.send(frame).is_err() {
			self.pending.forget(id);
			return Err(Error::ConnectionClosed(
				"transport writer has exited".to_string(),
			));
		}
		Ok(pending)
	}

	/// Asks the dispatch loop to stop. Pending calls are drained.
	pub fn terminate(&self) {
		if self.io.lock().take().is_some() {
			self.close("connection terminated before it started");
		} else {
			self.shutdown.notify_one();
		}
	}

	/// Runs the dispatch loop until the connection closes.
	///
	/// Returns `Ok(())` on end of stream or [`terminate`](Self::terminate),
	/// and the fatal error otherwise. May only be called once.
	pub async fn run(&self) -> Result<()> {
		let Io {
			mut sender,
			mut receiver,
			mut outbound_rx,
		} = self.io.lock().take().ok_or(Error::AlreadyRunning)?;

		let (write_failed_tx, mut write_failed_rx) = mpsc::unbounded_channel::<Error>();
		let writer = tokio::spawn(async move {
			while let Some(frame) = outbound_rx.recv().await {
				if let Err(e) = sender.send_frame(&frame).await {
					tracing::error!("Transport write error: {}", e);
					let _ = write_failed_tx.send(e);
					break;
				}
			}
		});

		let (outcome, reason) = loop {
			let next = tokio::select! {
				frame = receiver.next_frame::<Message>() => frame,
				Some(e) = write_failed_rx.recv() => Err(e),
				_ = self.shutdown.notified() => {
					break (Ok(()), "connection terminated by client".to_string());
				}
			};

			match next {
				Ok(Some(message)) => {
					if let Err(e) = self.dispatch(message) {
						tracing::error!("Fatal dispatch error: {}", e);
						let reason = e.to_string();
						break (Err(e), reason);
					}
				}
				Ok(None) => break (Ok(()), "transport reached end of stream".to_string()),
				Err(e) => {
					tracing::error!("Transport read error: {}", e);
					let reason = e.to_string();
					break (Err(e), reason);
				}
			}
		};

		self.close(&reason);
		writer.abort();
		outcome
	}

	fn close(&self, reason: &str) {
		self.state.send_replace(ConnectionState::Closing);
		let drained = self.pending.drain_on_close(reason);
		self.objects.clear();
		self.state.send_replace(ConnectionState::Closed);
		tracing::debug!(drained, reason, "connection closed");
	}

	/// Handles one inbound message. An error is fatal to the connection.
	pub(crate) fn dispatch(&self, message: Message) -> Result<()> {
		match message {
			Message::Response(response) => self.dispatch_response(response),
			Message::Event(event) => match event.method.as_str() {
				CREATE_METHOD => self.handle_create(event),
				INIT_METHOD => {
					tracing::debug!(guid = %event.guid, "__init__");
					self.objects.initialize(&event.guid, &event.params)
				}
				DISPOSE_METHOD => {
					self.objects.retire(&event.guid)?;
					tracing::debug!(guid = %event.guid, "disposed object");
					Ok(())
				}
				_ => self.dispatch_event(event),
			},
			Message::Unknown(value) if value.get("id").is_some() => {
				self.reject_malformed_response(value)
			}
			Message::Unknown(value) => {
				tracing::debug!(
					"Unknown message type (forward-compatible, ignored): {}",
					value
				);
				Ok(())
			}
		}
	}

	/// A message carrying an `id` is a response even when it does not parse.
	fn reject_malformed_response(&self, value: Value) -> Result<()> {
		let reason = format!("malformed response: {value}");
		let id = value
			.get("id")
			.and_then(Value::as_u64)
			.and_then(|id| u32::try_from(id).ok());
		if let Some(id) = id {
			// Unknown ids fall through to the fatal error below.
			let _ = self
				.pending
				.resolve(id, Err(Error::ProtocolInvariant(reason.clone())));
		}
		Err(Error::ProtocolInvariant(reason))
	}

	fn dispatch_response(&self, response: Response) -> Result<()> {
		let Response { id, result, error } = response;

		if let Some(error) = error {
			tracing::debug!(id, "received error response");
			return self
				.pending
				.resolve(id, Err(Error::from(error.into_payload())));
		}

		tracing::debug!(id, "received response");
		match self.objects.resolve_payload(result.unwrap_or(Value::Null)) {
			Ok(payload) => self.pending.resolve(id, Ok(payload)),
			Err(Error::ProtocolInvariant(reason)) => {
				// The caller learns the real cause; everyone else sees the close.
				self.pending
					.resolve(id, Err(Error::ProtocolInvariant(reason.clone())))?;
				Err(Error::ProtocolInvariant(reason))
			}
			Err(e) => Err(e),
		}
	}

	fn handle_create(&self, event: Event) -> Result<()> {
		let type_name = event.type_name.as_deref().ok_or_else(|| {
			Error::ProtocolInvariant(format!("__create__ for {} missing 'type'", event.guid))
		})?;
		self.materialize(type_name, event.guid.clone(), &event.params)?;
		tracing::debug!(guid = %event.guid, type_name, "created object");
		Ok(())
	}

	fn materialize(
		&self,
		type_name: &str,
		guid: Arc<str>,
		params: &Value,
	) -> Result<Arc<dyn ChannelOwner>> {
		let connection: Weak<dyn ConnectionLike> = self.weak_self.clone();
		let channel = Channel::new(guid, Arc::from(type_name), connection);
		let factory = self.factory.read().clone();
		self.objects.materialize(factory.as_deref(), channel, params)
	}

	fn dispatch_event(&self, event: Event) -> Result<()> {
		let object = self.objects.resolve(&event.guid)?;
		let payload = self.objects.resolve_payload(event.params)?;
		tracing::debug!(guid = %event.guid, method = %event.method, "dispatching event");

		object.on_event(&event.method, &payload);
		object.channel().dispatch_event(&event.method, &payload);
		Ok(())
	}
}

impl ConnectionLike for Connection {
	fn send_message(&self, guid: &str, method: &str, params: Value) -> Result<PendingResult> {
		Connection::send_message(self, guid, method, params)
	}

	fn objects(&self) -> &ObjectStore {
		&self.objects
	}
}
