mod common;

use std::time::Duration;

use pwire::{
	ChannelOwner, ContextEvent, ElementHandle, Frame, GotoOptions, OpaqueObject, PageEvent,
	WaitUntil,
};
use serde_json::{Value, json};

#[tokio::test]
async fn test_browser_types_are_bootstrapped() {
	let (playwright, _engine) = common::start();

	assert_eq!(playwright.chromium().name(), "chromium");
	assert_eq!(playwright.firefox().guid(), "firefox");
	assert_eq!(playwright.browser_type("webkit").unwrap().name(), "webkit");
	assert!(playwright.browser_type("netscape").is_none());
	assert_eq!(playwright.connection().objects().len(), 3);
}

#[tokio::test]
async fn test_launch_sends_options_and_returns_browser() {
	let (playwright, mut engine) = common::start();

	let chromium = playwright.chromium().clone();
	let call = tokio::spawn(async move {
		let options = pwire::LaunchOptions::new().headless(true);
		chromium.launch(Some(&options)).await
	});

	let request = engine.expect("chromium", "launch").await;
	assert_eq!(request.params, json!({"options": {"headless": true}}));
	engine.create("browser", "browser@1", json!({})).await;
	engine.respond(request.id, json!({"guid": "browser@1"})).await;

	let browser = call.await.unwrap().unwrap();
	assert_eq!(browser.guid(), "browser@1");
	assert!(browser.contexts().is_empty());
}

#[tokio::test]
async fn test_context_and_page_graph() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;
	let context = engine.new_context(&browser, "context@1").await;

	assert_eq!(browser.contexts().len(), 1);
	assert_eq!(context.browser().unwrap().guid(), "browser@1");
	assert!(context.pages().is_empty());

	let mut context_events = context.subscribe();
	let page = engine.new_page(&context, 1).await;

	assert_eq!(context.pages().len(), 1);
	assert_eq!(page.context().unwrap().guid(), "context@1");
	let main_frame = page.main_frame().unwrap();
	assert_eq!(main_frame.url(), "about:blank");
	assert_eq!(main_frame.page().unwrap().guid(), "page@1");
	assert!(main_frame.parent_frame().is_none());
	assert_eq!(page.frames().len(), 1);

	match context_events.try_recv() {
		Some(ContextEvent::Page(created)) => assert_eq!(created.guid(), "page@1"),
		other => panic!("expected page event, got {other:?}"),
	}
}

#[tokio::test]
async fn test_frame_navigation_updates_url_and_notifies_page() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;
	let context = engine.new_context(&browser, "context@1").await;
	let page = engine.new_page(&context, 1).await;

	let mut events = page.subscribe();
	let navigation = page.wait_for_navigation(Some(Duration::from_secs(5)));

	let client = page.clone();
	let call = tokio::spawn(async move {
		let options = GotoOptions::new().wait_until(WaitUntil::Load);
		client.goto("https://example.com", Some(&options)).await
	});

	let request = engine.expect("page@1", "goto").await;
	assert_eq!(
		request.params,
		json!({"url": "https://example.com", "options": {"waitUntil": "load"}})
	);
	engine
		.event("frame@1", "frameNavigated", json!("https://example.com/"))
		.await;
	engine.respond(request.id, Value::Null).await;
	call.await.unwrap().unwrap();

	let frame = navigation.await.unwrap();
	assert_eq!(frame.url(), "https://example.com/");
	assert_eq!(page.url(), "https://example.com/");
	match events.recv().await {
		Some(PageEvent::FrameNavigated(frame)) => assert_eq!(frame.guid(), "frame@1"),
		other => panic!("expected navigation, got {other:?}"),
	}
}

#[tokio::test]
async fn test_frame_tree_follows_attach_and_detach() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;
	let context = engine.new_context(&browser, "context@1").await;
	let page = engine.new_page(&context, 1).await;

	engine
		.create(
			"frame",
			"frame@child",
			json!({
				"pageGuid": "page@1",
				"name": "ad",
				"url": "https://ads.example/",
				"parentFrameGuid": "frame@1"
			}),
		)
		.await;
	engine
		.event("page@1", "frameAttached", json!({"guid": "frame@child"}))
		.await;
	engine
		.event("frame@1", "frameAttached", json!({"guid": "frame@child"}))
		.await;

	// A call round trip orders the assertions after the events above.
	let title = sync_title(&page, &mut engine, "Example").await;
	assert_eq!(title, "Example");

	let frames: Vec<Frame> = page.frames();
	assert_eq!(frames.len(), 2);
	let main_frame = page.main_frame().unwrap();
	let children = main_frame.child_frames();
	assert_eq!(children.len(), 1);
	assert_eq!(children[0].name(), "ad");
	assert_eq!(children[0].parent_frame().unwrap().guid(), "frame@1");

	engine
		.event("page@1", "frameDetached", json!({"guid": "frame@child"}))
		.await;
	engine
		.event("frame@1", "frameDetached", json!({"guid": "frame@child"}))
		.await;
	engine.dispose("frame@child").await;
	sync_title(&page, &mut engine, "Example").await;

	assert_eq!(page.frames().len(), 1);
	assert!(main_frame.child_frames().is_empty());
	assert!(children[0].is_disposed());
}

#[tokio::test]
async fn test_query_selector_and_element_handle() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;
	let context = engine.new_context(&browser, "context@1").await;
	let page = engine.new_page(&context, 1).await;

	let client = page.clone();
	let missing = tokio::spawn(async move { client.query_selector("#nope").await });
	let request = engine.expect("page@1", "querySelector").await;
	assert_eq!(request.params, json!({"selector": "#nope"}));
	engine.respond(request.id, Value::Null).await;
	assert!(missing.await.unwrap().unwrap().is_none());

	let client = page.clone();
	let found = tokio::spawn(async move { client.query_selector("body").await });
	let request = engine.expect("page@1", "querySelector").await;
	engine
		.create("elementHandle", "handle@1", json!({"frameGuid": "frame@1"}))
		.await;
	engine.respond(request.id, json!({"guid": "handle@1"})).await;
	let body: ElementHandle = found.await.unwrap().unwrap().unwrap();
	assert_eq!(body.frame().unwrap().guid(), "frame@1");

	let client = body.clone();
	let text = tokio::spawn(async move { client.text_content().await });
	let request = engine.expect("handle@1", "textContent").await;
	engine.respond(request.id, json!("Example Domain")).await;
	assert_eq!(text.await.unwrap().unwrap().as_deref(), Some("Example Domain"));

	let client = body.clone();
	let click = tokio::spawn(async move { client.click(None).await });
	let request = engine.expect("handle@1", "click").await;
	assert_eq!(request.params, json!({"options": null}));
	engine.respond(request.id, Value::Null).await;
	click.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_closed_page_is_retired() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;
	let context = engine.new_context(&browser, "context@1").await;
	let page = engine.new_page(&context, 1).await;
	let page2 = engine.new_page(&context, 2).await;
	assert_eq!(context.pages().len(), 2);

	let mut events = page.subscribe();
	let client = page.clone();
	let close = tokio::spawn(async move { client.close(None).await });
	let request = engine.expect("page@1", "close").await;
	engine.event("page@1", "close", json!({})).await;
	engine
		.event("context@1", "pageClosed", json!({"guid": "page@1"}))
		.await;
	engine.dispose("frame@1").await;
	engine.dispose("page@1").await;
	engine.respond(request.id, Value::Null).await;
	close.await.unwrap().unwrap();

	assert!(matches!(events.recv().await, Some(PageEvent::Close)));
	assert_eq!(context.pages().len(), 1);
	assert_eq!(context.pages()[0].guid(), page2.guid());

	// The retained proxy fails locally and nothing reaches the engine.
	let err = page.title().await.unwrap_err();
	assert!(err.is_disposed(), "expected disposed error, got {err:?}");
	assert!(page.main_frame().is_none());
	engine.expect_silence().await;
}

#[tokio::test]
async fn test_context_close_event() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;
	let context = engine.new_context(&browser, "context@1").await;

	let mut events = context.subscribe();
	let client = context.clone();
	let close = tokio::spawn(async move { client.close().await });
	let request = engine.expect("context@1", "close").await;
	engine.event("context@1", "close", json!({})).await;
	engine
		.event("browser@1", "contextClosed", json!({"guid": "context@1"}))
		.await;
	engine.dispose("context@1").await;
	engine.respond(request.id, Value::Null).await;
	close.await.unwrap().unwrap();

	assert!(matches!(events.recv().await, Some(ContextEvent::Close)));
	assert!(browser.contexts().is_empty());
	assert!(context.is_disposed());
}

#[tokio::test]
async fn test_wait_for_page_sees_new_page() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;
	let context = engine.new_context(&browser, "context@1").await;

	// Registered before the page is announced, awaited after.
	let waiting = context.wait_for_page(Some(Duration::from_secs(5)));
	let page = engine.new_page(&context, 1).await;

	let seen = waiting.await.unwrap();
	assert_eq!(seen.guid(), page.guid());
}

#[tokio::test]
async fn test_wait_for_page_fails_when_context_closes() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;
	let context = engine.new_context(&browser, "context@1").await;

	let waiting = tokio::spawn(context.wait_for_page(None));
	engine.event("context@1", "close", json!({})).await;

	let err = tokio::time::timeout(Duration::from_secs(5), waiting)
		.await
		.expect("waiter was never woken")
		.unwrap()
		.unwrap_err();
	assert!(matches!(err, pwire::Error::UnexpectedResult(_)), "got {err:?}");
}

#[tokio::test]
async fn test_page_timeout_leaves_connection_usable() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;
	let context = engine.new_context(&browser, "context@1").await;
	let page = engine.new_page(&context, 1).await;

	page.set_default_timeout(Some(Duration::from_millis(50)));
	let client = page.clone();
	let call = tokio::spawn(async move { client.title().await });
	let request = engine.expect("page@1", "title").await;

	let err = call.await.unwrap().unwrap_err();
	assert!(err.is_timeout(), "got {err:?}");

	// The late answer is discarded and the next call goes through.
	engine.respond(request.id, json!("Too late")).await;
	page.set_default_timeout(None);
	assert_eq!(sync_title(&page, &mut engine, "On time").await, "On time");
	assert_eq!(
		playwright.connection().state(),
		pwire::ConnectionState::Open
	);
	assert_eq!(playwright.connection().pending_count(), 0);
}

#[tokio::test]
async fn test_remote_error_reaches_only_its_caller() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;
	let context = engine.new_context(&browser, "context@1").await;
	let page = engine.new_page(&context, 1).await;

	let client = page.clone();
	let call = tokio::spawn(async move { client.click("#missing", None).await });
	let request = engine.expect("page@1", "click").await;
	engine
		.fail(request.id, "TimeoutError", "waiting for selector \"#missing\"")
		.await;

	let err = call.await.unwrap().unwrap_err();
	assert!(err.is_timeout());
	assert_eq!(err.error_name(), Some("TimeoutError"));

	// The connection is still usable.
	assert_eq!(sync_title(&page, &mut engine, "Still here").await, "Still here");
}

#[tokio::test]
async fn test_unknown_types_are_opaque() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;

	engine
		.create("worker", "worker@1", json!({"url": "https://example.com/sw.js"}))
		.await;
	engine
		.event("browser@1", "serviceWorker", json!({"guid": "worker@1"}))
		.await;

	let client = browser.clone();
	let call = tokio::spawn(async move { client.close().await });
	let request = engine.expect("browser@1", "close").await;
	engine.respond(request.id, Value::Null).await;
	call.await.unwrap().unwrap();

	let worker = playwright
		.connection()
		.objects()
		.get_as::<OpaqueObject>("worker@1")
		.unwrap();
	assert_eq!(worker.initializer()["url"], "https://example.com/sw.js");
}

#[tokio::test]
async fn test_shutdown_closes_connection() {
	let (playwright, mut engine) = common::start();
	let browser = engine.launch_browser(&playwright).await;
	let connection = playwright.connection().clone();

	playwright.shutdown().await.unwrap();

	assert_eq!(connection.state(), pwire::ConnectionState::Closed);
	let err = browser.close().await.unwrap_err();
	assert!(err.is_connection_closed());
}

async fn sync_title(page: &pwire::Page, engine: &mut common::FakeEngine, title: &str) -> String {
	let client = page.clone();
	let call = tokio::spawn(async move { client.title().await });
	let request = engine.expect(&page.guid().to_string(), "title").await;
	engine.respond(request.id, json!(title)).await;
	call.await.unwrap().unwrap()
}
