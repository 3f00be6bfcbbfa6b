//! BDD step definitions for suspend behaviour.

use labstack::{Stack, StackLookup, StackStatus, SuspendStatus};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{POLL_INTERVAL, STACK_NAME, StepError, SuspendContext, ensure};

fn found(status: StackStatus) -> StackLookup {
    StackLookup::Found(Stack::new("lab-id", STACK_NAME, status))
}

#[given("the stack does not exist")]
fn stack_absent(suspend_context: SuspendContext) -> SuspendContext {
    suspend_context.backend.push_lookup(StackLookup::NotFound);
    suspend_context
}

#[given("the stack is observed as \"{status}\"")]
fn stack_observed(suspend_context: SuspendContext, status: StackStatus) -> SuspendContext {
    suspend_context.backend.push_lookup(found(status));
    suspend_context
}

#[given("the stack stays \"{status}\" for {times:u32} lookups")]
fn stack_stays(suspend_context: SuspendContext, status: StackStatus, times: u32) -> SuspendContext {
    for _ in 0..times {
        suspend_context.backend.push_lookup(found(status));
    }
    suspend_context
}

#[when("I suspend the stack")]
fn suspend_stack(mut suspend_context: SuspendContext) -> Result<SuspendContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Runtime(err.to_string()))?;
    let orchestrator = suspend_context.orchestrator();
    let result = runtime.block_on(async move { orchestrator.suspend(STACK_NAME).await });
    suspend_context.outcome = Some(result);
    Ok(suspend_context)
}

fn expect_status(suspend_context: &SuspendContext, status: SuspendStatus) -> Result<(), StepError> {
    let outcome = suspend_context.outcome()?;
    ensure(outcome.status == status, || {
        format!("expected {status:?}, got {outcome:?}")
    })
}

#[then("the suspend is skipped")]
fn suspend_skipped(suspend_context: &SuspendContext) -> Result<(), StepError> {
    expect_status(suspend_context, SuspendStatus::Skipped)
}

#[then("the suspend succeeds")]
fn suspend_succeeds(suspend_context: &SuspendContext) -> Result<(), StepError> {
    expect_status(suspend_context, SuspendStatus::Suspended)
}

#[then("the suspend is abandoned")]
fn suspend_abandoned(suspend_context: &SuspendContext) -> Result<(), StepError> {
    expect_status(suspend_context, SuspendStatus::Abandoned)
}

#[then("the suspend last saw \"{status}\"")]
fn suspend_last_saw(
    suspend_context: &SuspendContext,
    status: StackStatus,
) -> Result<(), StepError> {
    let seen = suspend_context.outcome()?.stack_status;
    ensure(seen == Some(status), || {
        format!("expected last status {status}, got {seen:?}")
    })
}

#[then("no suspend request is sent")]
fn no_suspend_request(suspend_context: &SuspendContext) -> Result<(), StepError> {
    let suspended = suspend_context.backend.suspended();
    ensure(suspended.is_empty(), || {
        format!("expected no suspend request, got {suspended:?}")
    })
}

#[then("a suspend request is sent for \"{name}\"")]
fn suspend_request_sent(suspend_context: &SuspendContext, name: String) -> Result<(), StepError> {
    let suspended = suspend_context.backend.suspended();
    ensure(suspended == [name.clone()], || {
        format!("expected one suspend request for {name}, got {suspended:?}")
    })
}

#[then("no stack is deleted")]
fn no_stack_deleted(suspend_context: &SuspendContext) -> Result<(), StepError> {
    let deleted = suspend_context.backend.deleted();
    ensure(deleted.is_empty(), || {
        format!("expected no delete, got {deleted:?}")
    })
}

#[then("the stack was looked up {count} times")]
fn looked_up(suspend_context: &SuspendContext, count: usize) -> Result<(), StepError> {
    let calls = suspend_context.backend.get_calls();
    ensure(calls == count, || {
        format!("expected {count} lookups, got {calls}")
    })
}

#[then("the suspend paused {count} times between lookups")]
fn suspend_paused(suspend_context: &SuspendContext, count: usize) -> Result<(), StepError> {
    let sleeps = suspend_context.clock.sleeps();
    ensure(sleeps == vec![POLL_INTERVAL; count], || {
        format!("expected {count} pauses of {POLL_INTERVAL:?}, got {sleeps:?}")
    })
}
