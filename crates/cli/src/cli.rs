use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};

use crate::types::BrowserKind;

#[derive(Parser, Debug)]
#[command(name = "pwire")]
#[command(about = "Drive a browser automation engine over its stdio pipe")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug with protocol traffic)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Launch a browser, open pages and print what the engine reports
	Demo(DemoArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
	/// Driver program (defaults to $PWIRE_DRIVER)
	#[arg(long, value_name = "PROGRAM")]
	pub driver: Option<PathBuf>,

	/// Argument passed to the driver (repeatable; defaults to $PWIRE_DRIVER_ARGS)
	#[arg(long = "driver-arg", value_name = "ARG", allow_hyphen_values = true)]
	pub driver_args: Vec<String>,

	/// Browser engine to launch
	#[arg(short, long, value_enum, default_value = "chromium")]
	pub browser: BrowserKind,

	/// Page to open (repeatable, one page per URL)
	#[arg(long = "url", value_name = "URL", default_values = ["https://example.com", "https://webkit.org"])]
	pub urls: Vec<String>,

	/// Timeout for every call made by the demo, in milliseconds
	#[arg(long, value_name = "MS")]
	pub timeout_ms: Option<u64>,
}

/// Help colors in cargo's palette.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
}
