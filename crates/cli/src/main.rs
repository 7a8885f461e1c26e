use anyhow::Context;
use clap::Parser;
use pwire_cli::{cli::Cli, commands, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	commands::dispatch(cli).await.context("pwire failed")
}
