//! `pwire demo`: a guided tour of the object graph.
//!
//! Launches a browser, opens one page per URL in a shared context, reports
//! navigation events and derived state (frames, pages, contexts) as the
//! engine updates them, then tears everything down in order.

use std::io::Write;
use std::time::Duration;

use pwire::{ContextOptions, DriverCommand, Page, PageEvent, Playwright};

use crate::cli::DemoArgs;
use crate::error::{CliError, Result};
use crate::types::BrowserKind;

/// Settings for [`run`] that do not concern the driver.
#[derive(Debug, Clone)]
pub struct DemoOptions {
	pub browser: BrowserKind,
	pub urls: Vec<String>,
	pub timeout: Option<Duration>,
}

impl From<&DemoArgs> for DemoOptions {
	fn from(args: &DemoArgs) -> Self {
		Self {
			browser: args.browser,
			urls: args.urls.clone(),
			timeout: args.timeout_ms.map(Duration::from_millis),
		}
	}
}

/// Builds the driver command from flags, falling back to the environment.
pub fn driver_command(args: &DemoArgs) -> Result<DriverCommand> {
	match &args.driver {
		Some(program) => Ok(DriverCommand::new(program).args(&args.driver_args)),
		None => {
			let command = DriverCommand::from_env().map_err(|_| CliError::NoDriver)?;
			Ok(command.args(&args.driver_args))
		}
	}
}

pub async fn execute(args: DemoArgs) -> Result<()> {
	let command = driver_command(&args)?;
	tracing::info!(program = %command.program.display(), "starting driver");
	let playwright = Playwright::launch(&command).await?;

	let mut stdout = std::io::stdout();
	let outcome = run(&playwright, &DemoOptions::from(&args), &mut stdout).await;

	// Shut down even when the tour failed, but report the tour's error first.
	let shutdown = playwright.shutdown().await;
	outcome?;
	shutdown.map_err(Into::into)
}

/// Runs the tour against a connected client, writing the transcript to `out`.
pub async fn run<W: Write>(playwright: &Playwright, options: &DemoOptions, out: &mut W) -> Result<()> {
	let browser_type = playwright
		.browser_type(options.browser.as_str())
		.ok_or_else(|| CliError::UnknownBrowser(options.browser.to_string()))?;

	writeln!(out, "Launching {}...", browser_type.name())?;
	let browser = browser_type.launch(None).await?;

	writeln!(out, "Creating context...")?;
	let context = browser
		.new_context(Some(&ContextOptions::new().no_viewport()))
		.await?;
	writeln!(out, "Pages in context: {}", context.pages().len())?;

	let mut pages: Vec<Page> = Vec::with_capacity(options.urls.len());
	for (index, url) in options.urls.iter().enumerate() {
		writeln!(out, "\nCreating page{}...", index + 1)?;
		let page = context.new_page().await?;
		page.set_default_timeout(options.timeout);

		visit(&page, url, index + 1, out).await?;
		writeln!(out, "Pages in context: {}", context.pages().len())?;
		pages.push(page);
	}

	let Some(first) = pages.first() else {
		return close_all(&browser, &context, out).await;
	};

	writeln!(out, "\nQuerying body...")?;
	match first.query_selector("body").await? {
		Some(body) => {
			let text = body.text_content().await?.unwrap_or_default();
			writeln!(out, "Body text: {}", text.trim())?;
		}
		None => writeln!(out, "No body element")?,
	}

	writeln!(out, "Closing page1...")?;
	first.close(None).await?;
	writeln!(out, "Pages in context: {}", context.pages().len())?;

	close_all(&browser, &context, out).await
}

async fn visit<W: Write>(page: &Page, url: &str, n: usize, out: &mut W) -> Result<()> {
	let mut events = page.subscribe();

	writeln!(out, "Navigating page{n} to {url}...")?;
	page.goto(url, None).await?;

	// Navigation events precede the goto response on the wire.
	while let Some(event) = events.try_recv() {
		if let PageEvent::FrameNavigated(frame) = event {
			writeln!(out, "Frame navigated to {}", frame.url())?;
		}
	}

	writeln!(out, "Page{n} main frame url: {}", page.url())?;
	writeln!(out, "Page{n} title: {}", page.title().await?)?;
	writeln!(out, "Frames in page{n}: {}", page.frames().len())?;
	Ok(())
}

async fn close_all<W: Write>(
	browser: &pwire::Browser,
	context: &pwire::BrowserContext,
	out: &mut W,
) -> Result<()> {
	writeln!(out, "\nContexts: {}", browser.contexts().len())?;
	writeln!(out, "Closing context...")?;
	context.close().await?;
	writeln!(out, "Contexts: {}", browser.contexts().len())?;

	writeln!(out, "Closing browser")?;
	browser.close().await?;
	Ok(())
}
