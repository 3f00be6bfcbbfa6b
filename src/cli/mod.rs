//! Command-line interface definitions for the `labstack` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `labstack` binary.
#[derive(Debug, Parser)]
#[command(
    name = "labstack",
    about = "Launch, suspend, and grade lab stacks on an OpenStack orchestration service",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Make sure a stack is up and reachable, creating or resuming it.
    #[command(
        name = "launch",
        about = "Make sure a stack is up and reachable, creating or resuming it"
    )]
    Launch(LaunchCommand),
    /// Suspend a stack if it is up.
    #[command(name = "suspend", about = "Suspend a stack if it is up")]
    Suspend(SuspendCommand),
    /// Run check commands on a stack and count how many pass.
    #[command(name = "check", about = "Run check commands on a stack and count how many pass")]
    Check(CheckCommand),
}

/// Arguments for the `labstack launch` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct LaunchCommand {
    /// Name of the stack to launch.
    #[arg(value_name = "STACK_NAME")]
    pub(crate) stack_name: String,
    /// Orchestration template used when the stack has to be created.
    #[arg(long, value_name = "PATH")]
    pub(crate) template: String,
    /// Account the readiness check logs in as.
    #[arg(long, value_name = "USER")]
    pub(crate) user: String,
}

/// Arguments for the `labstack suspend` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct SuspendCommand {
    /// Name of the stack to suspend.
    #[arg(value_name = "STACK_NAME")]
    pub(crate) stack_name: String,
}

/// Arguments for the `labstack check` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct CheckCommand {
    /// Host name or IP address of the stack.
    #[arg(long, value_name = "ADDR")]
    pub(crate) address: String,
    /// Stack the host belongs to; selects the identity file.
    #[arg(long, value_name = "NAME")]
    pub(crate) stack_name: String,
    /// Account to run the checks as.
    #[arg(long, value_name = "USER")]
    pub(crate) user: String,
    /// Check command to run; repeat for a batch. Runs in the given order.
    #[arg(long = "command", value_name = "CMD", required = true)]
    pub(crate) commands: Vec<String>,
}
