//! Scripted doubles for the collaborator seams, shared by unit and
//! integration tests.
//!
//! The doubles here record every call they receive and replay pre-seeded
//! responses in FIFO order. State lives behind `Arc<Mutex<_>>` so clones share
//! one script and the futures they hand out stay `Send`.

use std::collections::{BTreeMap, VecDeque};
use std::env;
use std::ffi::OsString;
use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::backend::{
    BackendFuture, Clock, PlainFuture, StackBackend, StackTemplate, StackVerifier, Verification,
};
use crate::process::{CommandOutput, CommandRunner, SpawnError};
use crate::progress::{RemoteShell, SessionTarget};
use crate::stack::{Stack, StackLookup};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct RunnerState {
    outputs: VecDeque<CommandOutput>,
    invocations: Vec<CommandInvocation>,
}

/// Command runner replaying scripted client outputs.
///
/// Every call is recorded. Once the script runs dry, calls fail with a
/// [`SpawnError`] as if the binary were missing.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    state: Arc<Mutex<RunnerState>>,
}

/// One call received by [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Binary the caller asked for.
    pub program: String,
    /// Arguments in the order they were passed.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Program and arguments joined by single spaces.
    #[must_use]
    pub fn command_string(&self) -> String {
        self.args.iter().fold(self.program.clone(), |mut line, arg| {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
            line
        })
    }
}

impl ScriptedRunner {
    /// Creates a runner with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls received so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        lock(&self.state).invocations.clone()
    }

    /// Queues a clean exit with no output.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Queues an exit with `code` and a canned stderr line.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Queues an arbitrary client result.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        lock(&self.state).outputs.push_back(CommandOutput {
            code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, SpawnError> {
        let mut state = lock(&self.state);
        state.invocations.push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        state.outputs.pop_front().ok_or_else(|| SpawnError {
            program: program.to_owned(),
            message: String::from("script exhausted"),
        })
    }
}

/// Errors raised by [`ScriptedBackend`].
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum ScriptedBackendError {
    /// `get_stack` was called after every scripted lookup was consumed.
    #[error("no scripted lookup available")]
    Exhausted,
    /// Simulated create rejection.
    #[error("simulated create failure")]
    Create,
    /// Simulated delete rejection.
    #[error("simulated delete failure")]
    Delete,
    /// Simulated suspend rejection.
    #[error("simulated suspend failure")]
    Suspend,
    /// Simulated resume rejection.
    #[error("simulated resume failure")]
    Resume,
}

/// Arguments of one `create_stack` call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateCall {
    /// Requested stack name.
    pub name: String,
    /// Template reference passed to the backend.
    pub template: String,
}

#[derive(Debug, Default)]
struct BackendState {
    lookups: VecDeque<StackLookup>,
    get_calls: usize,
    created: Vec<CreateCall>,
    deleted: Vec<String>,
    suspended: Vec<String>,
    resumed: Vec<String>,
    fail_create: bool,
    fail_delete: bool,
    fail_suspend: bool,
    fail_resume: bool,
}

/// Stack backend replaying scripted lookups and recording mutating calls.
///
/// Mutating calls are recorded even when scripted to fail. `create_stack`
/// hands out `<name>-id` as the new stack id.
#[derive(Clone, Debug, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<BackendState>>,
}

impl ScriptedBackend {
    /// Creates a backend with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result of the next `get_stack` call.
    pub fn push_lookup(&self, lookup: StackLookup) {
        lock(&self.state).lookups.push_back(lookup);
    }

    /// Makes every `create_stack` call fail.
    pub fn fail_on_create(&self) {
        lock(&self.state).fail_create = true;
    }

    /// Makes every `delete_stack` call fail.
    pub fn fail_on_delete(&self) {
        lock(&self.state).fail_delete = true;
    }

    /// Makes every `suspend_stack` call fail.
    pub fn fail_on_suspend(&self) {
        lock(&self.state).fail_suspend = true;
    }

    /// Makes every `resume_stack` call fail.
    pub fn fail_on_resume(&self) {
        lock(&self.state).fail_resume = true;
    }

    /// Number of `get_stack` calls received so far.
    #[must_use]
    pub fn get_calls(&self) -> usize {
        lock(&self.state).get_calls
    }

    /// Recorded `create_stack` calls.
    #[must_use]
    pub fn created(&self) -> Vec<CreateCall> {
        lock(&self.state).created.clone()
    }

    /// Ids passed to `delete_stack`.
    #[must_use]
    pub fn deleted(&self) -> Vec<String> {
        lock(&self.state).deleted.clone()
    }

    /// Names or ids passed to `suspend_stack`.
    #[must_use]
    pub fn suspended(&self) -> Vec<String> {
        lock(&self.state).suspended.clone()
    }

    /// Names or ids passed to `resume_stack`.
    #[must_use]
    pub fn resumed(&self) -> Vec<String> {
        lock(&self.state).resumed.clone()
    }

    /// Number of lookups still queued.
    #[must_use]
    pub fn remaining_lookups(&self) -> usize {
        lock(&self.state).lookups.len()
    }
}

impl StackBackend for ScriptedBackend {
    type Error = ScriptedBackendError;

    fn get_stack<'a>(
        &'a self,
        _name_or_id: &'a str,
    ) -> BackendFuture<'a, StackLookup, Self::Error> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.get_calls += 1;
            state
                .lookups
                .pop_front()
                .ok_or(ScriptedBackendError::Exhausted)
        })
    }

    fn create_stack<'a>(
        &'a self,
        name: &'a str,
        template: &'a StackTemplate,
    ) -> BackendFuture<'a, String, Self::Error> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.created.push(CreateCall {
                name: name.to_owned(),
                template: template.as_str().to_owned(),
            });
            if state.fail_create {
                return Err(ScriptedBackendError::Create);
            }
            Ok(format!("{name}-id"))
        })
    }

    fn delete_stack<'a>(&'a self, id: &'a str) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.deleted.push(id.to_owned());
            if state.fail_delete {
                return Err(ScriptedBackendError::Delete);
            }
            Ok(())
        })
    }

    fn suspend_stack<'a>(&'a self, name_or_id: &'a str) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.suspended.push(name_or_id.to_owned());
            if state.fail_suspend {
                return Err(ScriptedBackendError::Suspend);
            }
            Ok(())
        })
    }

    fn resume_stack<'a>(&'a self, name_or_id: &'a str) -> BackendFuture<'a, (), Self::Error> {
        Box::pin(async move {
            let mut state = lock(&self.state);
            state.resumed.push(name_or_id.to_owned());
            if state.fail_resume {
                return Err(ScriptedBackendError::Resume);
            }
            Ok(())
        })
    }
}

/// Clock that returns immediately and records every requested pause.
#[derive(Clone, Debug, Default)]
pub struct RecordingClock {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingClock {
    /// Creates a clock with no recorded pauses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pauses requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

impl Clock for RecordingClock {
    fn sleep(&self, duration: Duration) -> PlainFuture<'_, ()> {
        lock(&self.sleeps).push(duration);
        Box::pin(std::future::ready(()))
    }
}

/// Arguments of one `verify` call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifyCall {
    /// Stack handed to the verifier.
    pub stack: Stack,
    /// Stack name the launch was requested for.
    pub stack_name: String,
    /// Remote account the launch was requested for.
    pub user: String,
}

#[derive(Clone, Debug)]
enum VerifierScript {
    Pass(String),
    Fail(String),
}

/// Verifier returning a fixed outcome.
#[derive(Clone, Debug)]
pub struct StaticVerifier {
    script: VerifierScript,
    calls: Arc<Mutex<Vec<VerifyCall>>>,
}

impl StaticVerifier {
    /// Verifier that reports every stack reachable on `address`.
    ///
    /// An unparsable `address` turns every check into a failure.
    #[must_use]
    pub fn passing(address: impl Into<String>) -> Self {
        Self {
            script: VerifierScript::Pass(address.into()),
            calls: Arc::default(),
        }
    }

    /// Verifier that fails every check with `error`.
    #[must_use]
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            script: VerifierScript::Fail(error.into()),
            calls: Arc::default(),
        }
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<VerifyCall> {
        lock(&self.calls).clone()
    }
}

impl StackVerifier for StaticVerifier {
    fn verify<'a>(
        &'a self,
        stack: &'a Stack,
        stack_name: &'a str,
        user: &'a str,
    ) -> PlainFuture<'a, Verification> {
        lock(&self.calls).push(VerifyCall {
            stack: stack.clone(),
            stack_name: stack_name.to_owned(),
            user: user.to_owned(),
        });
        let verification = match &self.script {
            VerifierScript::Pass(address) => match address.parse::<IpAddr>() {
                Ok(ip) => Verification::passed(stack.status, ip),
                Err(err) => Verification::failed(stack.status, err.to_string(), None),
            },
            VerifierScript::Fail(error) => Verification::failed(stack.status, error.clone(), None),
        };
        Box::pin(std::future::ready(verification))
    }
}

/// Errors raised by [`ScriptedShell`].
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum ScriptedShellError {
    /// Simulated connection failure.
    #[error("simulated connection failure")]
    Open,
    /// A command ran after every scripted exit status was consumed.
    #[error("no scripted exit status available")]
    Exhausted,
}

#[derive(Debug, Default)]
struct ShellState {
    exit_statuses: VecDeque<Option<i32>>,
    opened: Vec<SessionTarget>,
    commands: Vec<(usize, String)>,
    closed: Vec<usize>,
    fail_open: bool,
}

/// Remote shell replaying scripted exit statuses.
///
/// Sessions are numbered from zero in the order they were opened.
#[derive(Clone, Debug, Default)]
pub struct ScriptedShell {
    state: Arc<Mutex<ShellState>>,
}

impl ScriptedShell {
    /// Creates a shell with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the exit status of the next command.
    pub fn push_exit_status(&self, status: Option<i32>) {
        lock(&self.state).exit_statuses.push_back(status);
    }

    /// Makes every `open_session` call fail.
    pub fn fail_on_open(&self) {
        lock(&self.state).fail_open = true;
    }

    /// Targets passed to `open_session`.
    #[must_use]
    pub fn opened(&self) -> Vec<SessionTarget> {
        lock(&self.state).opened.clone()
    }

    /// Commands run so far, paired with their session number.
    #[must_use]
    pub fn commands(&self) -> Vec<(usize, String)> {
        lock(&self.state).commands.clone()
    }

    /// Session numbers closed so far.
    #[must_use]
    pub fn closed(&self) -> Vec<usize> {
        lock(&self.state).closed.clone()
    }
}

impl RemoteShell for ScriptedShell {
    type Session = usize;
    type Error = ScriptedShellError;

    fn open_session(&self, target: &SessionTarget) -> Result<Self::Session, Self::Error> {
        let mut state = lock(&self.state);
        let session = state.opened.len();
        state.opened.push(target.clone());
        if state.fail_open {
            return Err(ScriptedShellError::Open);
        }
        Ok(session)
    }

    fn run(&self, session: &mut Self::Session, command: &str) -> Result<Option<i32>, Self::Error> {
        let mut state = lock(&self.state);
        state.commands.push((*session, command.to_owned()));
        state
            .exit_statuses
            .pop_front()
            .ok_or(ScriptedShellError::Exhausted)
    }

    fn close_session(&self, session: Self::Session) -> Result<(), Self::Error> {
        lock(&self.state).closed.push(session);
        Ok(())
    }
}

/// Produces a payload matching `openstack stack show -f json`.
#[must_use]
pub fn json_stack(id: &str, name: &str, status: &str, outputs: &[(&str, &str)]) -> String {
    let outputs_json = outputs
        .iter()
        .map(|(key, value)| format!("{{\"output_key\":\"{key}\",\"output_value\":\"{value}\"}}"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{{\"id\":\"{id}\",\"stack_name\":\"{name}\",\"stack_status\":\"{status}\",\"outputs\":[{outputs_json}]}}"
    )
}

/// Serialises tests that touch process environment variables.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Sets environment variables for the lifetime of the guard.
///
/// Holds [`ENV_LOCK`] while alive and puts back the original values (or
/// removes the variables) when dropped.
pub struct EnvGuard {
    originals: BTreeMap<String, Option<OsString>>,
    _lock: AsyncMutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Takes the lock and applies `pairs` in order.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        let lock_guard = ENV_LOCK.lock().await;
        let mut originals = BTreeMap::new();
        for &(key, value) in pairs {
            originals
                .entry(key.to_owned())
                .or_insert_with(|| env::var_os(key));
            // SAFETY: every writer holds `ENV_LOCK`.
            unsafe { env::set_var(key, value) };
        }
        Self {
            originals,
            _lock: lock_guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in &self.originals {
            // SAFETY: `ENV_LOCK` is still held through `_lock`.
            unsafe {
                if let Some(value) = original {
                    env::set_var(key, value);
                } else {
                    env::remove_var(key);
                }
            }
        }
    }
}
