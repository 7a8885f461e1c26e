//! Pending-call table.
//!
//! Every issued request owns one slot keyed by its id. The dispatch loop
//! resolves a slot exactly once and removes it; closing the connection drains
//! every remaining slot with `ConnectionClosed`, so no caller waits forever.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::channel::Payload;
use crate::error::{Error, Result};

type Slot = oneshot::Sender<Result<Payload>>;

#[derive(Default)]
struct PendingState {
	last_id: u32,
	slots: HashMap<u32, Slot>,
	/// Set once by `drain_on_close`; later registrations fail with this reason.
	closed: Option<String>,
}

/// Requests awaiting a response, keyed by request id.
#[derive(Default)]
pub struct PendingCalls {
	state: Mutex<PendingState>,
}

impl PendingCalls {
	pub fn new() -> Self {
		Self::default()
	}

	/// Allocates the next id and an unresolved slot for it.
	///
	/// Ids start at 1 and are never reused on this connection.
	pub fn register(&self) -> Result<(u32, PendingResult)> {
		let mut state = self.state.lock();
		if let Some(reason) = &state.closed {
			return Err(Error::ConnectionClosed(reason.clone()));
		}
		let id = state.last_id.checked_add(1).ok_or_else(|| {
			Error::ProtocolInvariant("request id space exhausted".to_string())
		})?;
		state.last_id = id;

		let (tx, rx) = oneshot::channel();
		state.slots.insert(id, tx);
		Ok((id, PendingResult { id, rx }))
	}

	/// Removes `id` and fulfils its slot.
	///
	/// An id that is not pending (never issued, or already answered) is a
	/// protocol violation.
	pub fn resolve(&self, id: u32, outcome: Result<Payload>) -> Result<()> {
		let slot = self.state.lock().slots.remove(&id).ok_or_else(|| {
			Error::ProtocolInvariant(format!("response to unknown request id {id}"))
		})?;
		if slot.send(outcome).is_err() {
			// The caller gave up (timeout or dropped future).
			tracing::debug!(id, "discarding resolution for abandoned call");
		}
		Ok(())
	}

	/// Drops a slot whose request never reached the transport.
	pub(crate) fn forget(&self, id: u32) {
		self.state.lock().slots.remove(&id);
	}

	/// Resolves every pending slot with `ConnectionClosed` and refuses new
	/// registrations. Returns the number of drained calls.
	pub fn drain_on_close(&self, reason: &str) -> usize {
		let slots: Vec<(u32, Slot)> = {
			let mut state = self.state.lock();
			state.closed.get_or_insert_with(|| reason.to_string());
			state.slots.drain().collect()
		};
		let drained = slots.len();
		for (id, slot) in slots {
			tracing::debug!(id, "draining pending call");
			let _ = slot.send(Err(Error::ConnectionClosed(reason.to_string())));
		}
		drained
	}

	pub fn len(&self) -> usize {
		self.state.lock().slots.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn is_closed(&self) -> bool {
		self.state.lock().closed.is_some()
	}
}

/// Future for the outcome of one issued call.
///
/// Dropping it does not touch the pending table; the slot stays until the
/// engine answers or the connection closes, and that late outcome is discarded.
#[derive(Debug)]
pub struct PendingResult {
	id: u32,
	rx: oneshot::Receiver<Result<Payload>>,
}

impl PendingResult {
	/// Request id this result belongs to.
	pub fn id(&self) -> u32 {
		self.id
	}

	/// Races the result against a timer.
	pub async fn with_timeout(self, timeout: Duration) -> Result<Payload> {
		let id = self.id;
		match tokio::time::timeout(timeout, self).await {
			Ok(outcome) => outcome,
			Err(_) => Err(Error::Timeout(format!(
				"request {id} did not complete within {}ms",
				timeout.as_millis()
			))),
		}
	}
}

impl Future for PendingResult {
	type Output = Result<Payload>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.rx).poll(cx).map(|received| {
			received.unwrap_or_else(|_| {
				Err(Error::ConnectionClosed(
					"pending call dropped without resolution".to_string(),
				))
			})
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_ids_start_at_one_and_increase() {
		let pending = PendingCalls::new();
		let ids: Vec<u32> = (0..3).map(|_| pending.register().unwrap().0).collect();
		assert_eq!(ids, vec![1, 2, 3]);
		assert_eq!(pending.len(), 3);
	}

	#[tokio::test]
	async fn test_resolve_exactly_once() {
		let pending = PendingCalls::new();
		let (id, result) = pending.register().unwrap();

		pending
			.resolve(id, Ok(Payload::Value(json!("done"))))
			.unwrap();
		assert!(pending.is_empty());

		let second = pending.resolve(id, Ok(Payload::Value(json!("again"))));
		assert!(matches!(second, Err(Error::ProtocolInvariant(_))));

		let payload = result.await.unwrap();
		assert_eq!(payload.into_value().unwrap(), "done");
	}

	#[test]
	fn test_unknown_id_is_reported() {
		let pending = PendingCalls::new();
		let err = pending.resolve(99, Ok(Payload::Value(json!(null)))).unwrap_err();
		assert!(err.to_string().contains("unknown request id 99"));
	}

	#[tokio::test]
	async fn test_drain_on_close() {
		let pending = PendingCalls::new();
		let results: Vec<PendingResult> = (0..3).map(|_| pending.register().unwrap().1).collect();

		assert_eq!(pending.drain_on_close("engine exited"), 3);
		assert!(pending.is_empty());

		for result in results {
			let err = result.await.unwrap_err();
			assert!(err.is_connection_closed());
			assert!(err.to_string().contains("engine exited"));
		}

		let late = pending.register().unwrap_err();
		assert!(late.is_connection_closed());
	}

	#[tokio::test]
	async fn test_timeout_leaves_slot_for_late_response() {
		let pending = PendingCalls::new();
		let (id, result) = pending.register().unwrap();

		let err = result
			.with_timeout(Duration::from_millis(10))
			.await
			.unwrap_err();
		assert!(err.is_timeout());
		assert_eq!(pending.len(), 1);

		// The late response is accepted and dropped, not treated as unknown.
		pending
			.resolve(id, Ok(Payload::Value(json!("late"))))
			.unwrap();
		assert!(pending.is_empty());
	}
}
