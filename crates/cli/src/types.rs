use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Browser engine to drive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
	#[default]
	Chromium,
	Firefox,
	Webkit,
}

impl BrowserKind {
	/// Guid of the matching locally registered browser type.
	pub fn as_str(&self) -> &'static str {
		match self {
			BrowserKind::Chromium => "chromium",
			BrowserKind::Firefox => "firefox",
			BrowserKind::Webkit => "webkit",
		}
	}
}

impl std::fmt::Display for BrowserKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
