//! BDD step definitions for grading over SSH.

use labstack::{ProgressResult, ProgressStatus};
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{CheckOutcome, KEY_DIR, ProgressContext, STACK_NAME, StepError, ensure};

#[given("the host accepts the session")]
fn host_accepts(progress_context: ProgressContext) -> ProgressContext {
    progress_context.runner.push_success();
    progress_context
}

#[given("the next check exits with {code:i32}")]
fn check_exits(progress_context: ProgressContext, code: i32) -> ProgressContext {
    progress_context.runner.push_output(Some(code), "", "");
    progress_context
}

#[given("the host closes the session")]
fn host_closes(progress_context: ProgressContext) -> ProgressContext {
    progress_context.runner.push_success();
    progress_context
}

#[given("the host is unreachable")]
fn host_unreachable(progress_context: ProgressContext) -> ProgressContext {
    progress_context.runner.push_output(
        Some(255),
        "",
        "ssh: connect to host 198.51.100.7 port 22: No route to host",
    );
    progress_context
}

#[given("the connection drops")]
fn connection_drops(progress_context: ProgressContext) -> ProgressContext {
    progress_context
        .runner
        .push_output(Some(255), "", "Connection reset by peer");
    progress_context
}

fn grade(
    mut progress_context: ProgressContext,
    commands: &[String],
) -> Result<ProgressContext, StepError> {
    let checker = progress_context.checker()?;
    let outcome = match checker.check(commands, &ProgressContext::target()) {
        Ok(result) => CheckOutcome::Graded(result),
        Err(err) => CheckOutcome::from(err),
    };
    progress_context.outcome = Some(outcome);
    Ok(progress_context)
}

#[when("I grade the batch \"{commands}\"")]
fn grade_batch(
    progress_context: ProgressContext,
    commands: String,
) -> Result<ProgressContext, StepError> {
    let batch: Vec<String> = commands.split(", ").map(str::to_owned).collect();
    grade(progress_context, &batch)
}

#[when("I grade an empty batch")]
fn grade_empty_batch(progress_context: ProgressContext) -> Result<ProgressContext, StepError> {
    grade(progress_context, &[])
}

#[then("the check completes with {pass} of {total} passing")]
fn check_completes(
    progress_context: &ProgressContext,
    pass: usize,
    total: usize,
) -> Result<(), StepError> {
    let outcome = progress_context.outcome()?;
    let expected = CheckOutcome::Graded(ProgressResult {
        status: ProgressStatus::Complete,
        pass,
        total,
    });
    ensure(*outcome == expected, || {
        format!("expected {expected:?}, got {outcome:?}")
    })
}

#[then("opening the session on \"{address}\" fails with a lost connection")]
fn open_fails(progress_context: &ProgressContext, address: String) -> Result<(), StepError> {
    let outcome = progress_context.outcome()?;
    let expected = CheckOutcome::SessionFailed {
        address,
        connection_lost: true,
    };
    ensure(*outcome == expected, || {
        format!("expected {expected:?}, got {outcome:?}")
    })
}

#[then("check {index} could not be run")]
fn check_not_run(progress_context: &ProgressContext, index: usize) -> Result<(), StepError> {
    let outcome = progress_context.outcome()?;
    ensure(*outcome == CheckOutcome::CommandFailed { index }, || {
        format!("expected check {index} to fail, got {outcome:?}")
    })
}

#[then("the ssh client ran {count} times")]
fn client_ran(progress_context: &ProgressContext, count: usize) -> Result<(), StepError> {
    let ran = progress_context.runner.invocations().len();
    ensure(ran == count, || {
        format!("expected {count} ssh invocations, got {ran}")
    })
}

#[then("only one master connection is opened")]
fn one_master(progress_context: &ProgressContext) -> Result<(), StepError> {
    let masters = progress_context
        .runner
        .invocations()
        .iter()
        .filter(|call| call.args.iter().any(|arg| arg == "-M"))
        .count();
    ensure(masters == 1, || {
        format!("expected one master connection, got {masters}")
    })
}

#[then("every call before the close uses the lab identity")]
fn calls_use_identity(progress_context: &ProgressContext) -> Result<(), StepError> {
    let identity = format!("-i {KEY_DIR}/{STACK_NAME}");
    let invocations = progress_context.runner.invocations();
    let before_close = invocations.len().saturating_sub(1);
    let missing: Vec<String> = invocations
        .iter()
        .take(before_close)
        .map(|call| call.command_string())
        .filter(|command| !command.contains(identity.as_str()))
        .collect();
    ensure(missing.is_empty(), || {
        format!("calls without {identity}: {missing:?}")
    })
}

#[then("the master connection is closed last")]
fn closed_last(progress_context: &ProgressContext) -> Result<(), StepError> {
    let invocations = progress_context.runner.invocations();
    let last = invocations.last().map(|call| call.command_string());
    ensure(
        last.as_deref().is_some_and(|command| command.contains("-O exit")),
        || format!("expected the last call to close the master, got {last:?}"),
    )
}

