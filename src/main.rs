//! Binary entry point for the labstack CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8Path;
use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use labstack::files::{self, FileError};
use labstack::{
    HeatCliBackend, HeatError, LaunchError, LaunchOrchestrator, LaunchRequest, ProgressChecker,
    ProgressError, ReachabilityVerifier, SessionTarget, SshConfig, SshError, SshShell,
    StackConfig, StackTemplate, SuspendOrchestrator, VerifierSettings,
};

mod cli;

use cli::{CheckCommand, Cli, LaunchCommand, SuspendCommand};

/// Exit code used when a launch completed but reported a failed stack.
const EXIT_LAUNCH_FAILED: i32 = 2;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("template error: {0}")]
    Template(#[from] FileError),
    #[error("template {0} is empty")]
    EmptyTemplate(String),
    #[error("launch failed: {0}")]
    Launch(#[from] LaunchError<HeatError>),
    #[error("progress check failed: {0}")]
    Progress(#[from] ProgressError<SshError>),
    #[error("failed to write result: {0}")]
    Output(String),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Launch(command) => launch(command).await,
        Cli::Suspend(command) => suspend(command).await,
        Cli::Check(command) => check(&command),
    }
}

async fn launch(args: LaunchCommand) -> Result<i32, CliError> {
    let stack_config = load_stack_config()?;
    let ssh_config = load_ssh_config()?;
    let template = load_template(&args.template)?;

    let backend = heat_backend(&stack_config)?;
    let shell = SshShell::with_process_runner(ssh_config.clone())
        .map_err(|err| CliError::Config(err.to_string()))?;
    let verifier = ReachabilityVerifier::with_tokio_clock(
        shell,
        VerifierSettings::from_ssh_config(&ssh_config),
    );
    let orchestrator = LaunchOrchestrator::with_tokio_clock(backend, verifier)
        .with_budget(stack_config.retry_budget());

    let result = orchestrator
        .launch(&LaunchRequest::new(args.stack_name, template, args.user))
        .await?;
    write_json(io::stdout(), &result)?;

    Ok(if result.is_success() {
        0
    } else {
        EXIT_LAUNCH_FAILED
    })
}

async fn suspend(args: SuspendCommand) -> Result<i32, CliError> {
    let stack_config = load_stack_config()?;
    let backend = heat_backend(&stack_config)?;
    let orchestrator =
        SuspendOrchestrator::with_tokio_clock(backend).with_budget(stack_config.retry_budget());

    let result = orchestrator.suspend(&args.stack_name).await;
    write_json(io::stdout(), &result)?;
    Ok(0)
}

fn check(args: &CheckCommand) -> Result<i32, CliError> {
    let ssh_config = load_ssh_config()?;
    let shell = SshShell::with_process_runner(ssh_config)
        .map_err(|err| CliError::Config(err.to_string()))?;
    let target = SessionTarget::new(&args.address, &args.stack_name, &args.user);

    let result = ProgressChecker::new(shell).check(&args.commands, &target)?;
    write_json(io::stdout(), &result)?;
    Ok(0)
}

fn load_stack_config() -> Result<StackConfig, CliError> {
    let config =
        StackConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    config
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;
    Ok(config)
}

fn load_ssh_config() -> Result<SshConfig, CliError> {
    SshConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))
}

fn heat_backend(
    config: &StackConfig,
) -> Result<HeatCliBackend<labstack::ProcessCommandRunner>, CliError> {
    HeatCliBackend::with_process_runner(config.openstack_bin.clone(), config.auth_context())
        .map_err(|err| CliError::Config(err.to_string()))
}

/// Checks the template is readable and non-empty before any stack call.
fn load_template(path: &str) -> Result<StackTemplate, CliError> {
    let contents = files::read_to_string(Utf8Path::new(path))?;
    if contents.trim().is_empty() {
        return Err(CliError::EmptyTemplate(path.to_owned()));
    }
    Ok(StackTemplate::new(path))
}

fn write_json(mut target: impl Write, value: &impl Serialize) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|err| CliError::Output(err.to_string()))?;
    writeln!(target, "{rendered}").map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
