//! BDD step definitions for launch behaviour.

use labstack::test_support::StaticVerifier;
use labstack::{Stack, StackLookup, StackStatus};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{
    LAB_ADDRESS, LaunchContext, POLL_INTERVAL, STACK_NAME, StepError, TEMPLATE_PATH, ensure,
};

#[given("a lab stack that does not exist yet")]
fn stack_absent(launch_context: LaunchContext) -> LaunchContext {
    launch_context.backend.push_lookup(StackLookup::NotFound);
    launch_context
}

#[given("the stack \"{id}\" is observed as \"{status}\"")]
fn stack_observed(launch_context: LaunchContext, id: String, status: StackStatus) -> LaunchContext {
    launch_context
        .backend
        .push_lookup(StackLookup::Found(Stack::new(id, STACK_NAME, status)));
    launch_context
}

#[given("the stack \"{id}\" stays \"{status}\" for {times:u32} lookups")]
fn stack_stays(
    launch_context: LaunchContext,
    id: String,
    status: StackStatus,
    times: u32,
) -> LaunchContext {
    for _ in 0..times {
        launch_context
            .backend
            .push_lookup(StackLookup::Found(Stack::new(id.as_str(), STACK_NAME, status)));
    }
    launch_context
}

#[given("a retry budget of {retries:u32}")]
fn retry_budget(mut launch_context: LaunchContext, retries: u32) -> LaunchContext {
    launch_context.max_retries = retries;
    launch_context
}

#[given("the verifier refuses logins with \"{error}\"")]
fn verifier_refuses(mut launch_context: LaunchContext, error: String) -> LaunchContext {
    launch_context.verifier = StaticVerifier::failing(error);
    launch_context
}

#[when("I launch the stack")]
fn launch_stack(mut launch_context: LaunchContext) -> Result<LaunchContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Launch(err.to_string()))?;
    let orchestrator = launch_context.orchestrator();
    let request = LaunchContext::request();
    let result = runtime
        .block_on(async move { orchestrator.launch(&request).await })
        .map_err(|err| StepError::Launch(err.to_string()))?;
    launch_context.outcome = Some(result);
    Ok(launch_context)
}

#[then("the launch succeeds with the lab address")]
fn launch_succeeds(launch_context: &LaunchContext) -> Result<(), StepError> {
    let outcome = launch_context.outcome()?;
    ensure(outcome.is_success(), || {
        format!("expected success, got {outcome:?}")
    })?;
    ensure(outcome.ip == Some(LAB_ADDRESS), || {
        format!("expected address {LAB_ADDRESS}, got {:?}", outcome.ip)
    })
}

#[then("the launch reports \"{status}\"")]
fn launch_reports(launch_context: &LaunchContext, status: StackStatus) -> Result<(), StepError> {
    let outcome = launch_context.outcome()?;
    ensure(outcome.status == status, || {
        format!("expected {status}, got {}", outcome.status)
    })
}

#[then("the launch fails with \"{status}\"")]
fn launch_fails(launch_context: &LaunchContext, status: StackStatus) -> Result<(), StepError> {
    let outcome = launch_context.outcome()?;
    ensure(outcome.status == status, || {
        format!("expected {status}, got {}", outcome.status)
    })?;
    ensure(outcome.error.is_some() && outcome.ip.is_none(), || {
        format!("expected a failed result, got {outcome:?}")
    })
}

#[then("the launch error mentions \"{text}\"")]
fn launch_error_mentions(launch_context: &LaunchContext, text: String) -> Result<(), StepError> {
    let error = launch_context.outcome()?.error.as_deref().unwrap_or_default();
    ensure(error.contains(text.as_str()), || {
        format!("expected error mentioning {text}, got {error:?}")
    })
}

#[then("the launch error is \"{text}\"")]
fn launch_error_is(launch_context: &LaunchContext, text: String) -> Result<(), StepError> {
    let error = launch_context.outcome()?.error.as_deref();
    ensure(error == Some(text.as_str()), || {
        format!("expected error {text:?}, got {error:?}")
    })
}

#[then("one stack is created from the lab template")]
fn one_stack_created(launch_context: &LaunchContext) -> Result<(), StepError> {
    let created = launch_context.backend.created();
    let from_template = created
        .iter()
        .all(|call| call.name == STACK_NAME && call.template == TEMPLATE_PATH);
    ensure(created.len() == 1 && from_template, || {
        format!("expected one create of {STACK_NAME}, got {created:?}")
    })
}

#[then("no stack is created")]
fn no_stack_created(launch_context: &LaunchContext) -> Result<(), StepError> {
    let created = launch_context.backend.created();
    ensure(created.is_empty(), || {
        format!("expected no create, got {created:?}")
    })
}

#[then("the stack \"{id}\" is resumed")]
fn stack_resumed(launch_context: &LaunchContext, id: String) -> Result<(), StepError> {
    let resumed = launch_context.backend.resumed();
    ensure(resumed == [id.clone()], || {
        format!("expected a single resume of {id}, got {resumed:?}")
    })
}

#[then("no stack is resumed")]
fn no_stack_resumed(launch_context: &LaunchContext) -> Result<(), StepError> {
    let resumed = launch_context.backend.resumed();
    ensure(resumed.is_empty(), || {
        format!("expected no resume, got {resumed:?}")
    })
}

#[then("the stack \"{id}\" is deleted")]
fn stack_deleted(launch_context: &LaunchContext, id: String) -> Result<(), StepError> {
    let deleted = launch_context.backend.deleted();
    ensure(deleted == [id.clone()], || {
        format!("expected a single delete of {id}, got {deleted:?}")
    })
}

#[then("no stack is deleted")]
fn no_stack_deleted(launch_context: &LaunchContext) -> Result<(), StepError> {
    let deleted = launch_context.backend.deleted();
    ensure(deleted.is_empty(), || {
        format!("expected no delete, got {deleted:?}")
    })
}

#[then("the verifier logs in as \"{user}\"")]
fn verifier_logs_in_as(launch_context: &LaunchContext, user: String) -> Result<(), StepError> {
    let calls = launch_context.verifier.calls();
    let users: Vec<&str> = calls.iter().map(|call| call.user.as_str()).collect();
    ensure(users == [user.as_str()], || {
        format!("expected one verification as {user}, got {users:?}")
    })
}

#[then("the verifier is not called")]
fn verifier_not_called(launch_context: &LaunchContext) -> Result<(), StepError> {
    let calls = launch_context.verifier.calls();
    ensure(calls.is_empty(), || {
        format!("expected no verification, got {calls:?}")
    })
}

#[then("the stack was looked up {count} times")]
fn looked_up(launch_context: &LaunchContext, count: usize) -> Result<(), StepError> {
    let calls = launch_context.backend.get_calls();
    ensure(calls == count, || {
        format!("expected {count} lookups, got {calls}")
    })
}

#[then("{count} lookups are left unused")]
fn lookups_left(launch_context: &LaunchContext, count: usize) -> Result<(), StepError> {
    let remaining = launch_context.backend.remaining_lookups();
    ensure(remaining == count, || {
        format!("expected {count} unused lookups, got {remaining}")
    })
}

#[then("the launch paused {count} times between lookups")]
fn launch_paused(launch_context: &LaunchContext, count: usize) -> Result<(), StepError> {
    let sleeps = launch_context.clock.sleeps();
    ensure(sleeps == vec![POLL_INTERVAL; count], || {
        format!("expected {count} pauses of {POLL_INTERVAL:?}, got {sleeps:?}")
    })
}
