use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Default filter for a `-v` count. `RUST_LOG` overrides it.
pub fn default_filter(verbosity: u8) -> &'static str {
	// 0 = errors only, protocol traffic hidden
	// 1 (-v) = info for the cli, warn for the library crates
	// 2+ (-vv) = debug for everything, including every frame
	match verbosity {
		0 => "error,pwire_runtime=off,pwire=off",
		1 => "info,pwire_runtime=warn,pwire=warn",
		_ => "debug",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	// stdout carries the demo transcript; logs go to stderr.
	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_filters_parse() {
		for verbosity in 0..=3 {
			let filter = default_filter(verbosity);
			assert!(EnvFilter::try_new(filter).is_ok(), "bad filter {filter}");
		}
		assert_eq!(default_filter(5), "debug");
	}
}
