//! Application-level readiness check for launched stacks.
//!
//! The API reporting `CREATE_COMPLETE` only means the resources exist. A
//! stack is ready once its published address accepts SSH connections and the
//! stack user can log in with the stack's own key.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use camino::Utf8PathBuf;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::backend::{Clock, PlainFuture, StackVerifier, TokioClock, Verification};
use crate::files;
use crate::progress::{RemoteShell, SessionTarget};
use crate::ssh::SshConfig;
use crate::stack::Stack;

/// Output carrying the address the stack is reachable on.
pub const PUBLIC_IP_OUTPUT: &str = "public_ip";

/// Output carrying the private key for the stack user.
pub const PRIVATE_KEY_OUTPUT: &str = "private_key";

/// Command run to confirm a login.
pub const LOGIN_CHECK_COMMAND: &str = "true";

/// Knobs for the reachability check.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifierSettings {
    /// Port probed on the stack.
    pub port: u16,
    /// Directory the stack keys are written to, one file per stack.
    pub key_dir: Option<Utf8PathBuf>,
    /// Number of TCP probes before giving up.
    pub probe_attempts: u32,
    /// Pause between two probes.
    pub probe_interval: Duration,
    /// Bound on a single TCP connect.
    pub connect_timeout: Duration,
}

impl VerifierSettings {
    /// Derives the settings from the SSH client configuration, so keys land
    /// where the shell looks for them.
    #[must_use]
    pub fn from_ssh_config(config: &SshConfig) -> Self {
        Self {
            port: config.port,
            key_dir: config.key_dir_path(),
            probe_attempts: config.probe_attempts,
            probe_interval: config.probe_interval(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    fn identity_file(&self, stack_name: &str) -> Option<Utf8PathBuf> {
        self.key_dir.as_ref().map(|dir| dir.join(stack_name))
    }
}

/// [`StackVerifier`] that probes SSH and confirms a login.
#[derive(Clone, Debug)]
pub struct ReachabilityVerifier<S, C = TokioClock> {
    shell: S,
    clock: C,
    settings: VerifierSettings,
}

impl<S: RemoteShell> ReachabilityVerifier<S, TokioClock> {
    /// Creates a verifier that sleeps on the Tokio timer.
    #[must_use]
    pub const fn with_tokio_clock(shell: S, settings: VerifierSettings) -> Self {
        Self::new(shell, TokioClock, settings)
    }
}

impl<S: RemoteShell, C> ReachabilityVerifier<S, C> {
    /// Creates a verifier over `shell`, pausing on `clock` between probes.
    #[must_use]
    pub const fn new(shell: S, clock: C, settings: VerifierSettings) -> Self {
        Self {
            shell,
            clock,
            settings,
        }
    }

    fn store_key(&self, stack: &Stack, stack_name: &str) -> Result<(), String> {
        let (Some(path), Some(key)) = (
            self.settings.identity_file(stack_name),
            stack.output(PRIVATE_KEY_OUTPUT),
        ) else {
            return Ok(());
        };
        files::write_private(&path, key).map_err(|err| err.to_string())?;
        debug!(stack = stack_name, path = %path, "stored stack private key");
        Ok(())
    }

    fn login(&self, target: &SessionTarget) -> Result<(), String> {
        let mut session = self
            .shell
            .open_session(target)
            .map_err(|err| err.to_string())?;
        let outcome = self.shell.run(&mut session, LOGIN_CHECK_COMMAND);
        if let Err(err) = self.shell.close_session(session) {
            warn!(stack = %target.stack_name, error = %err, "failed to close login check session");
        }
        match outcome {
            Ok(Some(0)) => Ok(()),
            Ok(Some(code)) => Err(format!("login check exited with status {code}")),
            Ok(None) => Err(String::from("login check terminated without an exit status")),
            Err(err) => Err(err.to_string()),
        }
    }
}

impl<S, C> ReachabilityVerifier<S, C>
where
    S: RemoteShell + Sync,
    C: Clock + Sync,
{
    async fn wait_for_port(&self, address: IpAddr) -> bool {
        let socket = SocketAddr::new(address, self.settings.port);
        let attempts = self.settings.probe_attempts;
        for attempt in 1..=attempts {
            let connect = timeout(self.settings.connect_timeout, TcpStream::connect(socket)).await;
            if matches!(connect, Ok(Ok(_))) {
                return true;
            }
            debug!(%socket, attempt, "ssh port not reachable yet");
            if attempt < attempts {
                self.clock.sleep(self.settings.probe_interval).await;
            }
        }
        false
    }

    async fn check(&self, stack: &Stack, stack_name: &str, user: &str) -> Verification {
        let Some(raw_address) = stack.output(PUBLIC_IP_OUTPUT) else {
            return Verification::failed(
                stack.status,
                format!("stack {stack_name} did not provide a public IP"),
                None,
            );
        };
        let Ok(address) = raw_address.trim().parse::<IpAddr>() else {
            return Verification::failed(
                stack.status,
                format!("stack {stack_name} published an invalid public IP '{raw_address}'"),
                None,
            );
        };

        if let Err(err) = self.store_key(stack, stack_name) {
            return Verification::failed(
                stack.status,
                format!("could not store the key for stack {stack_name}: {err}"),
                Some(address),
            );
        }

        if !self.wait_for_port(address).await {
            return Verification::failed(
                stack.status,
                format!(
                    "stack {stack_name} is not accepting connections on {address}:{}",
                    self.settings.port
                ),
                Some(address),
            );
        }

        let target = SessionTarget::new(address.to_string(), stack_name, user);
        if let Err(err) = self.login(&target) {
            return Verification::failed(
                stack.status,
                format!("could not log in to stack {stack_name} as {user}: {err}"),
                Some(address),
            );
        }

        info!(stack = stack_name, %address, "stack is reachable");
        Verification::passed(stack.status, address)
    }
}

impl<S, C> StackVerifier for ReachabilityVerifier<S, C>
where
    S: RemoteShell + Sync,
    C: Clock + Sync,
{
    fn verify<'a>(
        &'a self,
        stack: &'a Stack,
        stack_name: &'a str,
        user: &'a str,
    ) -> PlainFuture<'a, Verification> {
        Box::pin(self.check(stack, stack_name, user))
    }
}
