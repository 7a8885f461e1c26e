use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("no driver configured: pass --driver or set PWIRE_DRIVER")]
	NoDriver,

	#[error("browser type '{0}' is not registered")]
	UnknownBrowser(String),

	#[error(transparent)]
	Pwire(#[from] pwire::Error),

	#[error("failed to write output: {0}")]
	Io(#[from] std::io::Error),
}
