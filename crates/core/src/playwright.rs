//! Playwright - client entry point.
//!
//! Owns the [`Connection`], its dispatch task and, when launched through
//! [`Playwright::launch`], the driver process.

use std::sync::Arc;

use pwire_runtime::{
	Connection, DriverCommand, DriverProcess, Error, PipeTransport, Result,
};
use tokio::task::JoinHandle;

use crate::BrowserType;
use crate::object_factory::PwireFactory;

/// Guids of the locally registered browser type roots.
pub const BROWSER_TYPE_GUIDS: [&str; 3] = ["chromium", "firefox", "webkit"];

/// Handle to a running connection and its browser types.
///
/// # Example
///
/// ```ignore
/// use pwire::{DriverCommand, Playwright};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let command = DriverCommand::new("node").args(["lib/cli/index", "serve"]);
///     let playwright = Playwright::launch(&command).await?;
///
///     let browser = playwright.chromium().launch(None).await?;
///     let page = browser.new_page(None).await?;
///     page.goto("https://example.com", None).await?;
///     println!("{}", page.title().await?);
///
///     browser.close().await?;
///     playwright.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct Playwright {
	connection: Arc<Connection>,
	chromium: BrowserType,
	firefox: BrowserType,
	webkit: BrowserType,
	dispatch: JoinHandle<Result<()>>,
	driver: Option<DriverProcess>,
}

impl Playwright {
	/// Starts a client over an already connected transport.
	///
	/// Installs the proxy factory, registers the browser type roots and spawns
	/// the dispatch loop. Must be called within a tokio runtime.
	pub fn connect(transport: PipeTransport) -> Result<Self> {
		let connection = Connection::new(transport);
		connection.set_factory(Arc::new(PwireFactory));

		let [chromium, firefox, webkit] = BROWSER_TYPE_GUIDS.map(|guid| {
			connection
				.bootstrap(BrowserType::TYPE_NAME, guid)
				.and_then(|_| connection.objects().resolve_as::<BrowserType>(guid))
		});

		let dispatch = {
			let connection = Arc::clone(&connection);
			tokio::spawn(async move {
				let outcome = connection.run().await;
				if let Err(e) = &outcome {
					tracing::error!("Dispatch loop ended: {}", e);
				}
				outcome
			})
		};

		Ok(Self {
			connection,
			chromium: chromium?,
			firefox: firefox?,
			webkit: webkit?,
			dispatch,
			driver: None,
		})
	}

	/// Launches the driver and connects to it over its stdio.
	///
	/// # Errors
	///
	/// Returns `Error::LaunchFailed` if the driver cannot be started.
	pub async fn launch(command: &DriverCommand) -> Result<Self> {
		let mut driver = DriverProcess::launch(command).await?;
		let transport = driver.take_transport()?;
		let mut playwright = Self::connect(transport)?;
		tracing::debug!(pid = ?driver.id(), "driver connected");
		playwright.driver = Some(driver);
		Ok(playwright)
	}

	pub fn chromium(&self) -> &BrowserType {
		&self.chromium
	}

	pub fn firefox(&self) -> &BrowserType {
		&self.firefox
	}

	pub fn webkit(&self) -> &BrowserType {
		&self.webkit
	}

	/// Looks up a browser type by name (`chromium`, `firefox`, `webkit`).
	pub fn browser_type(&self, name: &str) -> Option<&BrowserType> {
		match name {
			"chromium" => Some(&self.chromium),
			"firefox" => Some(&self.firefox),
			"webkit" => Some(&self.webkit),
			_ => None,
		}
	}

	/// The underlying connection, for raw channel access and state checks.
	pub fn connection(&self) -> &Arc<Connection> {
		&self.connection
	}

	/// Stops the dispatch loop, kills the driver if this handle owns one, and
	/// returns how the loop ended.
	pub async fn shutdown(self) -> Result<()> {
		self.connection.terminate();

		let driver_outcome = match self.driver {
			Some(driver) => driver.shutdown().await,
			None => Ok(()),
		};

		let loop_outcome = match self.dispatch.await {
			// terminate() won the race and closed the connection before the loop started.
			Ok(Err(Error::AlreadyRunning)) => Ok(()),
			Ok(outcome) => outcome,
			Err(e) => Err(Error::ConnectionClosed(format!(
				"dispatch task failed: {e}"
			))),
		};

		driver_outcome?;
		loop_outcome
	}
}

impl std::fmt::Debug for Playwright {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Playwright")
			.field("state", &self.connection.state())
			.field("objects", &self.connection.objects().len())
			.field("driver", &self.driver.as_ref().and_then(DriverProcess::id))
			.finish()
	}
}
