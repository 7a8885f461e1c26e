//! pwire: typed proxies for a pipe-driven browser automation engine
//!
//! The engine owns every object (browsers, contexts, pages, frames, element
//! handles) and announces them over the wire; this crate mirrors them as
//! cheap, cloneable proxies whose state follows the engine's events.
//!
//! # Example
//!
//! ```ignore
//! use pwire::{DriverCommand, PageEvent, Playwright};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let playwright = Playwright::launch(&DriverCommand::from_env()?).await?;
//!     let browser = playwright.chromium().launch(None).await?;
//!     let context = browser.new_context(None).await?;
//!     let page = context.new_page().await?;
//!
//!     let mut events = page.subscribe();
//!     page.goto("https://example.com", None).await?;
//!     if let Some(PageEvent::FrameNavigated(frame)) = events.try_recv() {
//!         println!("navigated to {}", frame.url());
//!     }
//!
//!     let body = page.query_selector("body").await?;
//!     if let Some(body) = body {
//!         println!("{:?}", body.text_content().await?);
//!     }
//!
//!     context.close().await?;
//!     browser.close().await?;
//!     playwright.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod browser;
mod browser_context;
mod browser_type;
mod element_handle;
pub mod events;
mod frame;
pub mod object_factory;
pub mod options;
mod page;
pub mod playwright;
mod related;

pub use browser::Browser;
pub use browser_context::BrowserContext;
pub use browser_type::BrowserType;
pub use element_handle::ElementHandle;
pub use events::{ContextEvent, EventStream, EventWaiter, PageEvent};
pub use frame::Frame;
pub use object_factory::PwireFactory;
pub use options::{
	ClickOptions, CloseOptions, ContextOptions, GotoOptions, LaunchOptions, MouseButton,
	ScreenshotOptions, Viewport, WaitUntil,
};
pub use page::Page;
pub use playwright::Playwright;
pub use pwire_runtime::{
	Channel, ChannelOwner, Connection, ConnectionState, DriverCommand, Error, OpaqueObject,
	Payload, PipeTransport, Result, Subscription,
};
