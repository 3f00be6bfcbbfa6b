//! Error type for the openstack CLI backend.

use thiserror::Error;

use crate::process::SpawnError;

/// Errors returned by [`super::HeatCliBackend`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum HeatError {
    /// Raised when configuration is missing required values.
    #[error("invalid {field}: set LABSTACK_{env_suffix} or add {field} to labstack.toml", env_suffix = field.to_uppercase())]
    InvalidConfig {
        /// Name of the missing or invalid field.
        field: String,
    },
    /// Raised when the `openstack` client cannot be spawned.
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    /// Raised when the client returns a non-zero exit status.
    #[error("openstack stack {action} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Stack subcommand that was run.
        action: String,
        /// Exit status reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the command.
        stderr: String,
    },
    /// Raised when JSON output from the client cannot be interpreted.
    #[error("failed to parse stack {action} output: {message}")]
    Parse {
        /// Stack subcommand whose output was parsed.
        action: String,
        /// Parser error message.
        message: String,
    },
}
