//! Child process execution for the adapters that wrap provider clients.
//!
//! The `openstack` backend and the `ssh` shell both reach their remote ends
//! through a local client binary. [`CommandRunner`] is the seam between them
//! and the operating system, so tests can replay client responses.

use std::ffi::OsString;
use std::process::{Command, Output};

use thiserror::Error;
use tracing::debug;

/// Exit status and captured streams of a finished client process.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl CommandOutput {
    /// Whether the client exited with status zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Exit code as text, or `unknown` for signal terminations.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code
            .map_or_else(|| String::from("unknown"), |code| code.to_string())
    }

    /// Standard error without surrounding whitespace.
    #[must_use]
    pub fn stderr_text(&self) -> &str {
        self.stderr.trim()
    }
}

/// Raised when a client binary cannot be started at all.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("could not start {program}: {message}")]
pub struct SpawnError {
    /// Binary that was requested.
    pub program: String,
    /// Operating system error string.
    pub message: String,
}

/// Runs client binaries to completion.
pub trait CommandRunner {
    /// Runs `program` with `args` and waits for it to exit.
    ///
    /// A non-zero exit is not an error at this level; callers inspect the
    /// returned [`CommandOutput`].
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] when the process cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, SpawnError>;
}

/// [`CommandRunner`] spawning real child processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, SpawnError> {
        debug!(program, arg_count = args.len(), "running client");
        match Command::new(program).args(args).output() {
            Ok(output) => Ok(CommandOutput::from(output)),
            Err(err) => Err(SpawnError {
                program: program.to_owned(),
                message: err.to_string(),
            }),
        }
    }
}
