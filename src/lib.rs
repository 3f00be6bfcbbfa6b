//! Core library for the labstack lifecycle manager.
//!
//! The crate drives lab stacks on an asynchronous orchestration service
//! through three intents: launch (create or resume, then verify), suspend
//! (best effort), and progress checks (run graded commands over SSH). The
//! orchestrators only talk to the collaborator traits in [`backend`] and
//! [`progress`]; the `openstack` and `ssh` command-line adapters implement
//! them for production use.

pub mod backend;
pub mod config;
pub mod files;
pub mod heat;
pub mod launch;
pub mod poll;
pub mod process;
pub mod progress;
pub mod ssh;
pub mod stack;
pub mod suspend;
pub mod test_support;
pub mod verify;

pub use backend::{
    BackendFuture, Clock, PlainFuture, StackBackend, StackTemplate, StackVerifier, TokioClock,
    Verification,
};
pub use config::{ConfigError, StackConfig};
pub use heat::{AuthContext, HeatCliBackend, HeatError};
pub use launch::{LaunchError, LaunchOrchestrator, LaunchRequest, LaunchResult};
pub use poll::{PollOutcome, Poller, RetryBudget};
pub use process::{CommandOutput, CommandRunner, ProcessCommandRunner, SpawnError};
pub use progress::{
    ProgressChecker, ProgressError, ProgressResult, ProgressStatus, RemoteShell, SessionTarget,
};
pub use ssh::{SshConfig, SshError, SshSession, SshShell};
pub use stack::{
    Stack, StackAction, StackLookup, StackState, StackStatus, StatusClass, StatusParseError,
    classify, classify_status,
};
pub use suspend::{SuspendOrchestrator, SuspendResult, SuspendStatus};
pub use verify::{ReachabilityVerifier, VerifierSettings};
