//! BDD scenarios for launching stacks.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LaunchContext, launch_context};

#[scenario(
    path = "tests/features/launch.feature",
    name = "Create an absent stack and verify it"
)]
fn scenario_create_absent_stack(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "Recreate a stack whose creation failed earlier"
)]
fn scenario_recreate_failed_stack(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "Recreate a stack that was deleted"
)]
fn scenario_recreate_deleted_stack(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "Recreate a stack whose delete failed"
)]
fn scenario_recreate_after_failed_delete(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "Resume a suspended stack by id"
)]
fn scenario_resume_suspended_stack(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "Resume a stack whose suspend failed"
)]
fn scenario_resume_after_failed_suspend(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "Retry a resume that failed earlier"
)]
fn scenario_retry_failed_resume(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "Wait for a suspending stack before resuming it"
)]
fn scenario_wait_for_suspend_then_resume(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "A stack already being created is only waited for"
)]
fn scenario_wait_for_running_create(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "A stack whose running creation fails is deleted, not recreated"
)]
fn scenario_delete_failed_running_create(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "A stack already being resumed is only waited for"
)]
fn scenario_wait_for_running_resume(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "A stack whose running resume fails is deleted, not resumed again"
)]
fn scenario_delete_failed_running_resume(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "A failed create is deleted and reported"
)]
fn scenario_delete_failed_create(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "A failed resume is deleted and reported"
)]
fn scenario_delete_failed_resume(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "A stack stuck suspending times out even if it would settle later"
)]
fn scenario_time_out_stuck_suspend(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "A stack stuck creating times out"
)]
fn scenario_time_out_stuck_create(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "A created stack is only verified"
)]
fn scenario_verify_created_stack(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "A resumed stack is only verified"
)]
fn scenario_verify_resumed_stack(launch_context: LaunchContext) {
    let _ = launch_context;
}

#[scenario(
    path = "tests/features/launch.feature",
    name = "A verification failure is reported without deleting the stack"
)]
fn scenario_report_failed_verification(launch_context: LaunchContext) {
    let _ = launch_context;
}
