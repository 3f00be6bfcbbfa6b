//! Grading of remote work on a stack.
//!
//! The progress checker opens a single session on the stack, runs an ordered
//! batch of check commands over it, and counts how many exited with status
//! zero. Interpreting the counts is left to the caller.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Where and as whom a remote session is opened.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SessionTarget {
    /// Host name or IP address of the stack.
    pub address: String,
    /// Stack the host belongs to; selects the per-stack identity.
    pub stack_name: String,
    /// Remote account to log in as.
    pub user: String,
}

impl SessionTarget {
    /// Builds a session target.
    #[must_use]
    pub fn new(
        address: impl Into<String>,
        stack_name: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            stack_name: stack_name.into(),
            user: user.into(),
        }
    }
}

/// Remote command execution transport.
pub trait RemoteShell {
    /// Open connection that commands run over.
    type Session;
    /// Transport specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Opens a session on `target`.
    ///
    /// # Errors
    ///
    /// Returns the transport error when the connection cannot be established.
    fn open_session(&self, target: &SessionTarget) -> Result<Self::Session, Self::Error>;

    /// Runs `command` to completion and returns its exit status, or `None`
    /// when the command terminated without one.
    ///
    /// # Errors
    ///
    /// Returns the transport error when the command cannot be executed.
    fn run(&self, session: &mut Self::Session, command: &str) -> Result<Option<i32>, Self::Error>;

    /// Releases a session.
    ///
    /// # Errors
    ///
    /// Returns the transport error when tearing the connection down fails.
    fn close_session(&self, session: Self::Session) -> Result<(), Self::Error> {
        drop(session);
        Ok(())
    }
}

/// Completion marker reported by every progress check.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    /// The batch ran to the end.
    Complete,
}

/// Tally of a progress check.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ProgressResult {
    /// Always [`ProgressStatus::Complete`].
    pub status: ProgressStatus,
    /// Number of commands that exited with status zero.
    pub pass: usize,
    /// Number of commands in the batch.
    pub total: usize,
}

/// Transport failures raised while checking progress.
#[derive(Debug, Error)]
pub enum ProgressError<ShellError>
where
    ShellError: std::error::Error + 'static,
{
    /// Raised when the session cannot be opened.
    #[error("failed to open a session on {address}: {source}")]
    OpenSession {
        /// Address the session targeted.
        address: String,
        /// Transport error.
        #[source]
        source: ShellError,
    },
    /// Raised when a check command cannot be executed.
    #[error("failed to run check {index} on {address}: {source}")]
    Command {
        /// One-based position of the command in the batch.
        index: usize,
        /// Address the session targeted.
        address: String,
        /// Transport error.
        #[source]
        source: ShellError,
    },
}

/// Runs batches of check commands through a [`RemoteShell`].
#[derive(Clone, Debug)]
pub struct ProgressChecker<S> {
    shell: S,
}

impl<S: RemoteShell> ProgressChecker<S> {
    /// Creates a checker over `shell`.
    #[must_use]
    pub const fn new(shell: S) -> Self {
        Self { shell }
    }

    /// Runs `commands` in order over one session and counts the passes.
    ///
    /// A command passes when it exits with status zero. The session is closed
    /// afterwards; a failure to close it is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError`] when the session cannot be opened or a
    /// command cannot be executed.
    pub fn check(
        &self,
        commands: &[String],
        target: &SessionTarget,
    ) -> Result<ProgressResult, ProgressError<S::Error>> {
        let mut session =
            self.shell
                .open_session(target)
                .map_err(|source| ProgressError::OpenSession {
                    address: target.address.clone(),
                    source,
                })?;

        let mut pass = 0;
        for (index, command) in commands.iter().enumerate() {
            let exit_status = match self.shell.run(&mut session, command) {
                Ok(status) => status,
                Err(source) => {
                    self.close(session, target);
                    return Err(ProgressError::Command {
                        index: index.saturating_add(1),
                        address: target.address.clone(),
                        source,
                    });
                }
            };
            debug!(stack = %target.stack_name, check = index.saturating_add(1), ?exit_status, "check finished");
            if exit_status == Some(0) {
                pass += 1;
            }
        }

        self.close(session, target);
        info!(stack = %target.stack_name, pass, total = commands.len(), "progress check complete");
        Ok(ProgressResult {
            status: ProgressStatus::Complete,
            pass,
            total: commands.len(),
        })
    }

    fn close(&self, session: S::Session, target: &SessionTarget) {
        if let Err(err) = self.shell.close_session(session) {
            warn!(stack = %target.stack_name, error = %err, "failed to close remote session");
        }
    }
}
