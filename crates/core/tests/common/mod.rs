//! Scripted engine for integration tests.
//!
//! The test plays the engine side of the pipe: it reads the client's
//! requests and writes lifecycle messages, events and responses in exactly
//! the order a real engine would.

#![allow(dead_code)]

use std::time::Duration;

use pwire::{Browser, BrowserContext, ChannelOwner, Page, PipeTransport, Playwright};
use pwire_protocol::Request;
use pwire_runtime::{FrameReceiver, FrameSender};
use serde_json::{Value, json};
use tokio::io::duplex;

pub struct FakeEngine {
	sender: FrameSender,
	receiver: FrameReceiver,
}

/// Connects a client to a fresh scripted engine.
pub fn start() -> (Playwright, FakeEngine) {
	let (engine_read, client_write) = duplex(64 * 1024);
	let (client_read, engine_write) = duplex(64 * 1024);

	let playwright = Playwright::connect(PipeTransport::new(client_write, client_read))
		.expect("connect");
	let (sender, receiver) = PipeTransport::new(engine_write, engine_read).into_parts();
	(playwright, FakeEngine { sender, receiver })
}

impl FakeEngine {
	pub async fn send(&mut self, message: Value) {
		self.sender.send(&message).await.expect("engine write");
	}

	pub async fn create(&mut self, type_name: &str, guid: &str, params: Value) {
		self.send(json!({"guid": guid, "method": "__create__", "type": type_name, "params": params}))
			.await;
	}

	pub async fn init(&mut self, guid: &str, params: Value) {
		self.send(json!({"guid": guid, "method": "__init__", "params": params}))
			.await;
	}

	pub async fn event(&mut self, guid: &str, method: &str, params: Value) {
		self.send(json!({"guid": guid, "method": method, "params": params}))
			.await;
	}

	pub async fn dispose(&mut self, guid: &str) {
		self.send(json!({"guid": guid, "method": "__dispose__"})).await;
	}

	pub async fn respond(&mut self, id: u32, result: Value) {
		self.send(json!({"id": id, "result": result})).await;
	}

	pub async fn fail(&mut self, id: u32, name: &str, message: &str) {
		self.send(json!({"id": id, "error": {"name": name, "message": message}}))
			.await;
	}

	/// Reads the next request and checks its target and method.
	pub async fn expect(&mut self, guid: &str, method: &str) -> Request {
		let request: Request = tokio::time::timeout(Duration::from_secs(5), self.receiver.next_frame())
			.await
			.expect("timed out waiting for a request")
			.expect("malformed request")
			.expect("client closed its pipe");
		assert_eq!(&*request.guid, guid, "unexpected target for {}", request.method);
		assert_eq!(request.method, method);
		request
	}

	/// Asserts that the client writes nothing for a short while.
	pub async fn expect_silence(&mut self) {
		let next = tokio::time::timeout(
			Duration::from_millis(50),
			self.receiver.next_frame::<Value>(),
		)
		.await;
		assert!(next.is_err(), "unexpected request: {next:?}");
	}

	/// Answers `chromium.launch` with a new browser.
	pub async fn launch_browser(&mut self, playwright: &Playwright) -> Browser {
		let chromium = playwright.chromium().clone();
		let call = tokio::spawn(async move { chromium.launch(None).await });

		let request = self.expect("chromium", "launch").await;
		self.create("browser", "browser@1", json!({})).await;
		self.respond(request.id, json!({"guid": "browser@1"})).await;

		call.await.unwrap().expect("launch")
	}

	/// Answers `browser.newContext`, announcing the context to the browser.
	pub async fn new_context(&mut self, browser: &Browser, guid: &str) -> BrowserContext {
		let client = browser.clone();
		let call = tokio::spawn(async move { client.new_context(None).await });

		let request = self.expect("browser@1", "newContext").await;
		self.create("context", guid, json!({"browserGuid": "browser@1"}))
			.await;
		self.event("browser@1", "contextCreated", json!({"guid": guid}))
			.await;
		self.respond(request.id, json!({"guid": guid})).await;

		call.await.unwrap().expect("newContext")
	}

	/// Answers `context.newPage` the way the engine announces a page: page and
	/// main frame are created first, then initialized, since each refers to
	/// the other.
	pub async fn new_page(&mut self, context: &BrowserContext, n: u32) -> Page {
		let context_guid = context.guid().to_string();
		let page_guid = format!("page@{n}");
		let frame_guid = format!("frame@{n}");

		let client = context.clone();
		let call = tokio::spawn(async move { client.new_page().await });

		let request = self.expect(&context_guid, "newPage").await;
		self.create("page", &page_guid, Value::Null).await;
		self.create("frame", &frame_guid, Value::Null).await;
		self.init(
			&frame_guid,
			json!({
				"pageGuid": page_guid,
				"name": "",
				"url": "about:blank",
				"isDetached": false,
				"childFrameGuids": []
			}),
		)
		.await;
		self.init(
			&page_guid,
			json!({
				"contextGuid": context_guid,
				"mainFrameGuid": frame_guid,
				"frameGuids": [frame_guid]
			}),
		)
		.await;
		self.event(&context_guid, "pageCreated", json!({"guid": page_guid}))
			.await;
		self.respond(request.id, json!({"guid": page_guid})).await;

		call.await.unwrap().expect("newPage")
	}
}
