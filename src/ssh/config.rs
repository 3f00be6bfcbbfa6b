//! SSH configuration structures and validation.
//!
//! [`SshConfig`] is loaded via `ortho-config`, which merges defaults,
//! `labstack.toml`, and `LABSTACK_SSH_*` environment variables.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::process::SpawnError;

use super::util::expand_tilde;

/// Default SSH port probed and connected to on stacks.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// SSH client settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "LABSTACK_SSH",
    discovery(
        app_name = "labstack",
        env_var = "LABSTACK_CONFIG_PATH",
        config_file_name = "labstack.toml",
        dotfile_name = ".labstack.toml",
        project_file_name = "labstack.toml"
    )
)]
pub struct SshConfig {
    /// Path to the `ssh` executable.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Port the stacks accept SSH connections on.
    #[ortho_config(default = DEFAULT_SSH_PORT)]
    pub port: u16,
    /// Whether to force batch mode to avoid password prompts.
    #[ortho_config(default = true)]
    pub batch_mode: bool,
    /// Whether to enforce host key checking; stacks are ephemeral so this is
    /// off by default.
    #[ortho_config(default = false)]
    pub strict_host_key_checking: bool,
    /// Known hosts file override; defaults to `/dev/null`.
    #[ortho_config(default = "/dev/null".to_owned())]
    pub known_hosts_file: String,
    /// Directory holding one private key per stack, named after the stack.
    /// Supports tilde expansion. When unset, SSH falls back to its default
    /// key locations and stack keys are not stored.
    pub key_dir: Option<String>,
    /// Directory for ControlMaster sockets.
    #[ortho_config(default = "/tmp".to_owned())]
    pub control_dir: String,
    /// Seconds SSH waits for a connection before giving up.
    #[ortho_config(default = 10)]
    pub connect_timeout_secs: u64,
    /// Number of TCP probes made while waiting for a stack's SSH port.
    #[ortho_config(default = 30)]
    pub probe_attempts: u32,
    /// Seconds between two TCP probes.
    #[ortho_config(default = 2)]
    pub probe_interval_secs: u64,
}

/// Errors raised when loading the SSH configuration from layered sources.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SshConfigLoadError {
    /// Indicates that parsing or merging configuration layers failed.
    #[error("ssh configuration parsing failed: {0}")]
    Parse(String),
}

impl SshConfig {
    /// Loads configuration from defaults, configuration files, and
    /// environment variables without parsing CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`SshConfigLoadError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, SshConfigLoadError> {
        Self::load_from_iter([std::ffi::OsString::from("labstack")])
            .map_err(|err| SshConfigLoadError::Parse(err.to_string()))
    }

    /// Ensures configuration values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SshError::InvalidConfig`] when a required field is empty or
    /// a numeric setting is zero.
    pub fn validate(&self) -> Result<(), SshError> {
        Self::require_value(&self.ssh_bin, "ssh_bin")?;
        Self::require_value(&self.control_dir, "control_dir")?;
        Self::require_optional_value(self.key_dir.as_deref(), "key_dir")?;
        Self::require_nonzero(u64::from(self.port), "port")?;
        Self::require_nonzero(self.connect_timeout_secs, "connect_timeout_secs")?;
        Self::require_nonzero(u64::from(self.probe_attempts), "probe_attempts")?;
        Ok(())
    }

    /// Key directory with any leading `~/` expanded.
    #[must_use]
    pub fn key_dir_path(&self) -> Option<Utf8PathBuf> {
        self.key_dir.as_deref().map(expand_tilde)
    }

    /// Identity file for `stack_name`, when a key directory is configured.
    #[must_use]
    pub fn identity_file(&self, stack_name: &str) -> Option<Utf8PathBuf> {
        self.key_dir_path().map(|dir| dir.join(stack_name))
    }

    /// Pause between two TCP probes.
    #[must_use]
    pub const fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    fn require_optional_value(value: Option<&str>, field: &str) -> Result<(), SshError> {
        match value {
            None => Ok(()),
            Some(v) if !v.trim().is_empty() => Ok(()),
            Some(_) => Err(SshError::InvalidConfig {
                field: field.to_owned(),
            }),
        }
    }

    fn require_value(value: &str, field: &str) -> Result<(), SshError> {
        Self::require_optional_value(Some(value), field)
    }

    fn require_nonzero(value: u64, field: &str) -> Result<(), SshError> {
        if value == 0 {
            return Err(SshError::InvalidConfig {
                field: field.to_owned(),
            });
        }
        Ok(())
    }
}

/// Errors surfaced while talking to stacks over SSH.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SshError {
    /// Raised when configuration is missing required values.
    #[error("invalid {field}: set LABSTACK_SSH_{env_suffix} or add {field} to labstack.toml", env_suffix = field.to_uppercase())]
    InvalidConfig {
        /// Configuration field that failed validation.
        field: String,
    },
    /// Raised when the `ssh` client cannot be spawned.
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    /// Raised when the client reports a connection failure.
    #[error("ssh connection to {destination} failed with status {status_text}: {stderr}")]
    ConnectionFailed {
        /// `user@host` the client connected to.
        destination: String,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the client.
        stderr: String,
    },
}
