//! Driver process management
//!
//! Launches the automation engine as a child process with its stdin/stdout
//! piped, hands the pipes to a [`PipeTransport`], and reaps the process on
//! shutdown.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::error::{Error, Result};
use crate::transport::PipeTransport;

/// Environment variable naming the driver program.
pub const DRIVER_ENV: &str = "PWIRE_DRIVER";

/// Environment variable with whitespace-separated driver arguments.
pub const DRIVER_ARGS_ENV: &str = "PWIRE_DRIVER_ARGS";

/// How to start the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCommand {
	pub program: PathBuf,
	pub args: Vec<OsString>,
	pub envs: Vec<(OsString, OsString)>,
}

impl DriverCommand {
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
			args: Vec::new(),
			envs: Vec::new(),
		}
	}

	pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
		self.args.push(arg.into());
		self
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<OsString>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
		self.envs.push((key.into(), value.into()));
		self
	}

	/// Reads the command from `PWIRE_DRIVER` and `PWIRE_DRIVER_ARGS`.
	///
	/// # Errors
	///
	/// Returns `Error::LaunchFailed` if `PWIRE_DRIVER` is not set.
	pub fn from_env() -> Result<Self> {
		let program = std::env::var_os(DRIVER_ENV)
			.ok_or_else(|| Error::LaunchFailed(format!("{DRIVER_ENV} is not set")))?;
		let args = std::env::var(DRIVER_ARGS_ENV).unwrap_or_default();
		Ok(Self::new(program).args(split_args(&args)))
	}
}

fn split_args(args: &str) -> Vec<String> {
	args.split_whitespace().map(str::to_string).collect()
}

/// Running driver process.
#[derive(Debug)]
pub struct DriverProcess {
	process: Child,
}

impl DriverProcess {
	/// Spawns the driver with stdin/stdout piped and stderr inherited.
	///
	/// # Errors
	///
	/// Returns `Error::LaunchFailed` if the process cannot be spawned or exits
	/// immediately.
	pub async fn launch(command: &DriverCommand) -> Result<Self> {
		let mut cmd = Command::new(&command.program);
		cmd.args(&command.args)
			.envs(command.envs.iter().map(|(k, v)| (k, v)))
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true);

		tracing::debug!(program = %command.program.display(), "launching driver");
		let mut child = cmd
			.spawn()
			.map_err(|e| Error::LaunchFailed(format!("Failed to spawn process: {}", e)))?;

		// Check if process started successfully
		tokio::time::sleep(Duration::from_millis(100)).await;

		match child.try_wait() {
			Ok(Some(status)) => Err(Error::LaunchFailed(format!(
				"Driver process exited immediately with status: {}",
				status
			))),
			Ok(None) => Ok(Self { process: child }),
			Err(e) => Err(Error::LaunchFailed(format!(
				"Failed to check process status: {}",
				e
			))),
		}
	}

	/// Takes the driver's stdio as a transport. Can only succeed once.
	pub fn take_transport(&mut self) -> Result<PipeTransport> {
		let stdin = self
			.process
			.stdin
			.take()
			.ok_or_else(|| Error::LaunchFailed("Failed to get driver stdin".to_string()))?;
		let stdout = self
			.process
			.stdout
			.take()
			.ok_or_else(|| Error::LaunchFailed("Failed to get driver stdout".to_string()))?;
		Ok(PipeTransport::new(stdin, stdout))
	}

	/// OS process id, if the process is still running.
	pub fn id(&self) -> Option<u32> {
		self.process.id()
	}

	/// Kills the driver and waits for it to exit.
	pub async fn shutdown(mut self) -> Result<()> {
		drop(self.process.stdin.take());
		drop(self.process.stdout.take());

		if let Err(e) = self.process.start_kill() {
			// Already exited.
			tracing::debug!("driver kill skipped: {}", e);
		}

		match tokio::time::timeout(Duration::from_secs(5), self.process.wait()).await {
			Ok(Ok(status)) => {
				tracing::debug!(%status, "driver exited");
				Ok(())
			}
			Ok(Err(e)) => Err(Error::LaunchFailed(format!(
				"Failed to wait for process: {}",
				e
			))),
			Err(_) => Err(Error::LaunchFailed(
				"Driver did not exit within 5s of being killed".to_string(),
			)),
		}
	}
}
