//! Remote command execution over the system `ssh` client.
//!
//! Each session opens one multiplexed master connection (`ControlMaster`)
//! bound to a unique socket; every command of a batch then reuses that
//! connection, and closing the session asks the master to exit.

use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::process::{CommandRunner, ProcessCommandRunner};
use crate::progress::{RemoteShell, SessionTarget};

mod config;
mod util;

pub use config::{DEFAULT_SSH_PORT, SshConfig, SshConfigLoadError, SshError};
pub use util::expand_tilde;

/// Exit status the `ssh` client reserves for its own failures.
pub const SSH_CLIENT_FAILURE: i32 = 255;

/// Open master connection to a stack.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SshSession {
    socket: Utf8PathBuf,
    destination: String,
    identity: Option<Utf8PathBuf>,
}

impl SshSession {
    /// Control socket the master listens on.
    #[must_use]
    pub fn socket(&self) -> &Utf8Path {
        &self.socket
    }

    /// `user@host` the session is connected to.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }
}

/// [`RemoteShell`] implementation driving the `ssh` binary.
#[derive(Clone, Debug)]
pub struct SshShell<R: CommandRunner> {
    config: SshConfig,
    runner: R,
}

impl SshShell<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner.
    ///
    /// # Errors
    ///
    /// Returns [`SshError::InvalidConfig`] when validation fails.
    pub fn with_process_runner(config: SshConfig) -> Result<Self, SshError> {
        Self::new(config, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> SshShell<R> {
    /// Creates a shell using the provided runner and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SshError::InvalidConfig`] when validation fails.
    pub fn new(config: SshConfig, runner: R) -> Result<Self, SshError> {
        config.validate()?;
        Ok(Self { config, runner })
    }

    /// Returns a reference to the underlying configuration.
    #[must_use]
    pub const fn config(&self) -> &SshConfig {
        &self.config
    }

    fn common_ssh_options(&self, identity: Option<&Utf8Path>) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-p"),
            OsString::from(self.config.port.to_string()),
            OsString::from("-o"),
            OsString::from(format!(
                "ConnectTimeout={}",
                self.config.connect_timeout_secs
            )),
        ];

        if let Some(identity_file) = identity {
            args.push(OsString::from("-i"));
            args.push(OsString::from(identity_file.as_str()));
        }

        if self.config.batch_mode {
            args.push(OsString::from("-o"));
            args.push(OsString::from("BatchMode=yes"));
        }

        if !self.config.strict_host_key_checking {
            args.push(OsString::from("-o"));
            args.push(OsString::from("StrictHostKeyChecking=no"));
        }

        if !self.config.known_hosts_file.trim().is_empty() {
            args.push(OsString::from("-o"));
            args.push(OsString::from(format!(
                "UserKnownHostsFile={}",
                self.config.known_hosts_file
            )));
        }

        args
    }

    fn build_open_args(&self, session: &SshSession) -> Vec<OsString> {
        let mut args = self.common_ssh_options(session.identity.as_deref());
        args.extend([
            OsString::from("-M"),
            OsString::from("-S"),
            OsString::from(session.socket.as_str()),
            OsString::from("-o"),
            OsString::from("ControlPersist=yes"),
            OsString::from("-f"),
            OsString::from("-N"),
            OsString::from(&session.destination),
        ]);
        args
    }

    fn build_run_args(&self, session: &SshSession, command: &str) -> Vec<OsString> {
        let mut args = self.common_ssh_options(session.identity.as_deref());
        args.extend([
            OsString::from("-S"),
            OsString::from(session.socket.as_str()),
            OsString::from(&session.destination),
            OsString::from(command),
        ]);
        args
    }

    fn build_close_args(session: &SshSession) -> Vec<OsString> {
        vec![
            OsString::from("-S"),
            OsString::from(session.socket.as_str()),
            OsString::from("-O"),
            OsString::from("exit"),
            OsString::from(&session.destination),
        ]
    }

    fn control_socket(&self) -> Utf8PathBuf {
        expand_tilde(&self.config.control_dir)
            .join(format!("labstack-{}.sock", Uuid::new_v4().simple()))
    }
}

impl<R: CommandRunner> RemoteShell for SshShell<R> {
    type Session = SshSession;
    type Error = SshError;

    fn open_session(&self, target: &SessionTarget) -> Result<Self::Session, Self::Error> {
        let session = SshSession {
            socket: self.control_socket(),
            destination: format!("{}@{}", target.user, target.address),
            identity: self.config.identity_file(&target.stack_name),
        };
        let output = self
            .runner
            .run(&self.config.ssh_bin, &self.build_open_args(&session))?;
        if !output.is_success() {
            return Err(SshError::ConnectionFailed {
                destination: session.destination,
                status_text: output.status_text(),
                stderr: output.stderr,
            });
        }
        debug!(destination = %session.destination, socket = %session.socket, "opened ssh master connection");
        Ok(session)
    }

    /// Runs `command` over the session's master connection.
    ///
    /// Exit status 255 is reserved by the client for connection failures and
    /// is reported as [`SshError::ConnectionFailed`]; a remote command that
    /// itself exits 255 is indistinguishable from a broken connection.
    fn run(&self, session: &mut Self::Session, command: &str) -> Result<Option<i32>, Self::Error> {
        let output = self
            .runner
            .run(&self.config.ssh_bin, &self.build_run_args(session, command))?;
        if output.code == Some(SSH_CLIENT_FAILURE) {
            return Err(SshError::ConnectionFailed {
                destination: session.destination.clone(),
                status_text: output.status_text(),
                stderr: output.stderr,
            });
        }
        Ok(output.code)
    }

    fn close_session(&self, session: Self::Session) -> Result<(), Self::Error> {
        let output = self
            .runner
            .run(&self.config.ssh_bin, &Self::build_close_args(&session))?;
        if !output.is_success() {
            return Err(SshError::ConnectionFailed {
                destination: session.destination,
                status_text: output.status_text(),
                stderr: output.stderr,
            });
        }
        debug!(destination = %session.destination, "closed ssh master connection");
        Ok(())
    }
}
