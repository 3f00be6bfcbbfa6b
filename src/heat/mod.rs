//! Stack backend driving the `openstack` command-line client.
//!
//! Every backend call shells out to `openstack stack <action>`. Mutating
//! actions return as soon as the client has handed the request to the
//! orchestration service; their effect is observed through `stack show`.

use std::ffi::OsString;

use tracing::debug;

use crate::backend::{BackendFuture, StackBackend, StackTemplate};
use crate::process::{CommandOutput, CommandRunner, ProcessCommandRunner};
use crate::stack::StackLookup;

mod error;
mod types;

pub use error::HeatError;
pub use types::AuthContext;

use types::{HeatCreated, HeatStack};

/// Default `openstack` CLI binary name.
pub const DEFAULT_OPENSTACK_BIN: &str = "openstack";

/// [`StackBackend`] implementation backed by the `openstack` CLI.
#[derive(Clone, Debug)]
pub struct HeatCliBackend<R: CommandRunner> {
    openstack_bin: String,
    auth: AuthContext,
    runner: R,
}

impl HeatCliBackend<ProcessCommandRunner> {
    /// Creates a backend wired to the real process runner.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::InvalidConfig`] when the binary name is blank.
    pub fn with_process_runner(
        openstack_bin: impl Into<String>,
        auth: AuthContext,
    ) -> Result<Self, HeatError> {
        Self::new(openstack_bin, auth, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> HeatCliBackend<R> {
    /// Creates a backend using the provided runner.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::InvalidConfig`] when the binary name is blank.
    pub fn new(
        openstack_bin: impl Into<String>,
        auth: AuthContext,
        runner: R,
    ) -> Result<Self, HeatError> {
        let trimmed_bin = openstack_bin.into().trim().to_owned();
        if trimmed_bin.is_empty() {
            return Err(HeatError::InvalidConfig {
                field: String::from("openstack_bin"),
            });
        }
        Ok(Self {
            openstack_bin: trimmed_bin,
            auth,
            runner,
        })
    }

    /// Looks a stack up with `openstack stack show`.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError`] when the client fails for a reason other than the
    /// stack being absent, or when its output cannot be parsed.
    pub fn show(&self, name_or_id: &str) -> Result<StackLookup, HeatError> {
        let args = self.build_args("show", &[name_or_id], true);
        let output = self.runner.run(&self.openstack_bin, &args)?;
        if !output.is_success() && is_not_found(&output.stderr) {
            debug!(stack = name_or_id, "openstack reports stack not found");
            return Ok(StackLookup::NotFound);
        }
        let stdout = Self::check_output(output, "show")?;
        let payload = parse_json::<HeatStack>(&stdout, "show")?;
        let stack = payload.into_stack().map_err(|err| HeatError::Parse {
            action: String::from("show"),
            message: err.to_string(),
        })?;
        Ok(StackLookup::Found(stack))
    }

    /// Starts creating a stack with `openstack stack create`.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError`] when the client rejects the request or its output
    /// lacks the new stack id.
    pub fn create(&self, name: &str, template: &StackTemplate) -> Result<String, HeatError> {
        let args = self.build_args("create", &["-t", template.as_str(), name], true);
        let output = self.runner.run(&self.openstack_bin, &args)?;
        let stdout = Self::check_output(output, "create")?;
        let created = parse_json::<HeatCreated>(&stdout, "create")?;
        debug!(stack = name, id = %created.id, "openstack accepted stack create");
        Ok(created.id)
    }

    /// Starts deleting a stack with `openstack stack delete --yes`.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError`] when the client rejects the request.
    pub fn delete(&self, id: &str) -> Result<(), HeatError> {
        self.run_action("delete", &["--yes", id])
    }

    /// Starts suspending a stack with `openstack stack suspend`.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError`] when the client rejects the request.
    pub fn suspend(&self, name_or_id: &str) -> Result<(), HeatError> {
        self.run_action("suspend", &[name_or_id])
    }

    /// Starts resuming a stack with `openstack stack resume`.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError`] when the client rejects the request.
    pub fn resume(&self, name_or_id: &str) -> Result<(), HeatError> {
        self.run_action("resume", &[name_or_id])
    }

    fn run_action(&self, action: &str, operands: &[&str]) -> Result<(), HeatError> {
        let args = self.build_args(action, operands, false);
        let output = self.runner.run(&self.openstack_bin, &args)?;
        Self::check_output(output, action)?;
        debug!(action, operands = ?operands, "openstack accepted stack action");
        Ok(())
    }

    /// Builds `[auth...] stack <action> <operands...> [-f json]`.
    fn build_args(&self, action: &str, operands: &[&str], json: bool) -> Vec<OsString> {
        let mut args = Vec::new();

        if let Some(cloud) = &self.auth.os_cloud {
            args.push(OsString::from("--os-cloud"));
            args.push(OsString::from(cloud));
        }
        if let Some(auth_url) = &self.auth.os_auth_url {
            args.push(OsString::from("--os-auth-url"));
            args.push(OsString::from(auth_url));
        }

        args.push(OsString::from("stack"));
        args.push(OsString::from(action));
        args.extend(operands.iter().map(OsString::from));

        if json {
            args.push(OsString::from("-f"));
            args.push(OsString::from("json"));
        }
        args
    }

    /// Checks command output and converts failure to [`HeatError`].
    fn check_output(output: CommandOutput, action: &str) -> Result<String, HeatError> {
        if output.is_success() {
            return Ok(output.stdout);
        }
        Err(HeatError::CommandFailure {
            action: action.to_owned(),
            status: output.code,
            status_text: output.status_text(),
            stderr: output.stderr_text().to_owned(),
        })
    }
}

impl<R> StackBackend for HeatCliBackend<R>
where
    R: CommandRunner + Send + Sync,
{
    type Error = HeatError;

    fn get_stack<'a>(&'a self, name_or_id: &'a str) -> BackendFuture<'a, StackLookup, Self::Error> {
        Box::pin(async move { self.show(name_or_id) })
    }

    fn create_stack<'a>(
        &'a self,
        name: &'a str,
        template: &'a StackTemplate,
    ) -> BackendFuture<'a, String, Self::Error> {
        Box::pin(async move { self.create(name, template) })
    }

    fn delete_stack<'a>(&'a self, id: &'a str) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move { self.delete(id) })
    }

    fn suspend_stack<'a>(&'a self, name_or_id: &'a str) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move { self.suspend(name_or_id) })
    }

    fn resume_stack<'a>(&'a self, name_or_id: &'a str) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move { self.resume(name_or_id) })
    }
}

/// Matches the orchestration service's missing-stack messages, not a shell
/// reporting a missing client binary.
fn is_not_found(stderr: &str) -> bool {
    let lowered = stderr.to_lowercase();
    lowered.contains("stack not found")
        || (lowered.contains("stack") && lowered.contains("could not be found"))
}

fn parse_json<T>(stdout: &str, action: &str) -> Result<T, HeatError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str::<T>(stdout).map_err(|err| HeatError::Parse {
        action: action.to_owned(),
        message: err.to_string(),
    })
}
