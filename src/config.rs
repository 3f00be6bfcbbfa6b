//! Orchestration settings: which `openstack` client to run against which
//! cloud, and how long to wait for stacks to settle.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::heat::{AuthContext, DEFAULT_OPENSTACK_BIN};
use crate::poll::{DEFAULT_MAX_RETRIES, RetryBudget};

/// Orchestration settings derived from environment variables and
/// configuration files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "LABSTACK",
    discovery(
        app_name = "labstack",
        env_var = "LABSTACK_CONFIG_PATH",
        config_file_name = "labstack.toml",
        dotfile_name = ".labstack.toml",
        project_file_name = "labstack.toml"
    )
)]
pub struct StackConfig {
    /// Path to the `openstack` executable.
    #[ortho_config(default = DEFAULT_OPENSTACK_BIN.to_owned())]
    pub openstack_bin: String,
    /// Named cloud from `clouds.yaml` passed as `--os-cloud`.
    pub os_cloud: Option<String>,
    /// Identity endpoint passed as `--os-auth-url`.
    pub os_auth_url: Option<String>,
    /// Status re-fetches allowed after the first observation of each poll.
    #[ortho_config(default = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,
    /// Seconds between two status fetches.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
}

/// Where a setting can be supplied, quoted back in validation errors.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl StackConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(Self::missing(metadata));
        }
        Ok(())
    }

    fn require_optional_field(
        value: Option<&str>,
        metadata: &FieldMetadata,
    ) -> Result<(), ConfigError> {
        value.map_or(Ok(()), |inner| Self::require_field(inner, metadata))
    }

    fn missing(metadata: &FieldMetadata) -> ConfigError {
        ConfigError::MissingField(format!(
            "missing {}: set {} or add {} to labstack.toml",
            metadata.description, metadata.env_var, metadata.toml_key
        ))
    }

    /// Merges defaults, `labstack.toml` and `LABSTACK_*` variables. Command
    /// line arguments are left to the binary's own parser.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("labstack")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages include guidance on how
    /// to provide missing values via environment variables or configuration
    /// files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty or
    /// the poll interval is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.openstack_bin,
            &FieldMetadata::new("openstack CLI binary", "LABSTACK_OPENSTACK_BIN", "openstack_bin"),
        )?;
        Self::require_optional_field(
            self.os_cloud.as_deref(),
            &FieldMetadata::new("cloud name", "LABSTACK_OS_CLOUD", "os_cloud"),
        )?;
        Self::require_optional_field(
            self.os_auth_url.as_deref(),
            &FieldMetadata::new("identity endpoint", "LABSTACK_OS_AUTH_URL", "os_auth_url"),
        )?;
        if self.poll_interval_secs == 0 {
            return Err(Self::missing(&FieldMetadata::new(
                "non-zero poll interval",
                "LABSTACK_POLL_INTERVAL_SECS",
                "poll_interval_secs",
            )));
        }
        Ok(())
    }

    /// Budget applied to every status poll.
    #[must_use]
    pub const fn retry_budget(&self) -> RetryBudget {
        RetryBudget::new(
            self.max_retries,
            Duration::from_secs(self.poll_interval_secs),
        )
    }

    /// Cloud selection passed through to the `openstack` client.
    #[must_use]
    pub fn auth_context(&self) -> AuthContext {
        AuthContext {
            os_cloud: self.os_cloud.clone(),
            os_auth_url: self.os_auth_url.clone(),
        }
    }
}

/// Errors raised while loading or validating [`StackConfig`].
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// A setting is blank or out of range; the message says how to set it.
    #[error("invalid configuration: {0}")]
    MissingField(String),
    /// The layered sources could not be merged.
    #[error("could not load configuration: {0}")]
    Parse(String),
}
