//! Option structs for proxy operations.
//!
//! Each serializes to the `options` member of the request params. Unset
//! fields are omitted so the engine applies its own defaults.

use serde::Serialize;

/// Options for [`BrowserType::launch`](crate::BrowserType::launch).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchOptions {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub headless: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub args: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub executable_path: Option<String>,
	/// Launch timeout in milliseconds.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timeout: Option<f64>,
}

impl LaunchOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn headless(mut self, headless: bool) -> Self {
		self.headless = Some(headless);
		self
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args = Some(args.into_iter().map(Into::into).collect());
		self
	}

	pub fn executable_path(mut self, path: impl Into<String>) -> Self {
		self.executable_path = Some(path.into());
		self
	}
}

/// Viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
	pub width: u32,
	pub height: u32,
}

/// Options for [`Browser::new_context`](crate::Browser::new_context) and
/// [`Browser::new_page`](crate::Browser::new_page).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextOptions {
	/// `Some(None)` sends an explicit `null`, disabling the fixed viewport.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub viewport: Option<Option<Viewport>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_agent: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub locale: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub java_script_enabled: Option<bool>,
}

impl ContextOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn viewport(mut self, viewport: Viewport) -> Self {
		self.viewport = Some(Some(viewport));
		self
	}

	pub fn no_viewport(mut self) -> Self {
		self.viewport = Some(None);
		self
	}

	pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = Some(user_agent.into());
		self
	}
}

/// When a navigation is considered finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
	Load,
	#[serde(rename = "domcontentloaded")]
	DomContentLoaded,
	#[serde(rename = "networkidle")]
	NetworkIdle,
}

/// Options for [`Page::goto`](crate::Page::goto).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GotoOptions {
	/// Navigation timeout in milliseconds.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timeout: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub wait_until: Option<WaitUntil>,
}

impl GotoOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn timeout(mut self, timeout_ms: f64) -> Self {
		self.timeout = Some(timeout_ms);
		self
	}

	pub fn wait_until(mut self, wait_until: WaitUntil) -> Self {
		self.wait_until = Some(wait_until);
		self
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
	Left,
	Right,
	Middle,
}

/// Options for clicks on pages and element handles.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickOptions {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub button: Option<MouseButton>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub click_count: Option<u32>,
	/// Delay between mousedown and mouseup in milliseconds.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub delay: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub timeout: Option<f64>,
}

impl ClickOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn button(mut self, button: MouseButton) -> Self {
		self.button = Some(button);
		self
	}

	pub fn click_count(mut self, count: u32) -> Self {
		self.click_count = Some(count);
		self
	}
}

/// Options for [`Page::screenshot`](crate::Page::screenshot).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotOptions {
	/// File the engine writes the image to.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub full_page: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub omit_background: Option<bool>,
}

impl ScreenshotOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn path(mut self, path: impl Into<String>) -> Self {
		self.path = Some(path.into());
		self
	}

	pub fn full_page(mut self, full_page: bool) -> Self {
		self.full_page = Some(full_page);
		self
	}
}

/// Options for [`Page::close`](crate::Page::close).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseOptions {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub run_before_unload: Option<bool>,
}

/// Request params carrying an optional `options` member.
///
/// Serializes as `{"options": ...}`, with `null` when no options were given.
#[derive(Serialize)]
pub(crate) struct WithOptions<'a, T: Serialize> {
	pub options: Option<&'a T>,
}

impl<'a, T: Serialize> WithOptions<'a, T> {
	pub fn new(options: Option<&'a T>) -> Self {
		Self { options }
	}
}
