//! BDD scenarios for suspending stacks.

use rstest_bdd_macros::scenario;

use super::test_helpers::{SuspendContext, suspend_context};

#[scenario(
    path = "tests/features/suspend.feature",
    name = "Skip a stack that does not exist"
)]
fn scenario_skip_absent_stack(suspend_context: SuspendContext) {
    let _ = suspend_context;
}

#[scenario(
    path = "tests/features/suspend.feature",
    name = "Leave a suspended stack alone"
)]
fn scenario_leave_suspended_stack(suspend_context: SuspendContext) {
    let _ = suspend_context;
}

#[scenario(
    path = "tests/features/suspend.feature",
    name = "Leave a suspending stack alone"
)]
fn scenario_leave_suspending_stack(suspend_context: SuspendContext) {
    let _ = suspend_context;
}

#[scenario(
    path = "tests/features/suspend.feature",
    name = "Leave a failed stack alone"
)]
fn scenario_leave_failed_stack(suspend_context: SuspendContext) {
    let _ = suspend_context;
}

#[scenario(
    path = "tests/features/suspend.feature",
    name = "Leave a stack whose resume failed alone"
)]
fn scenario_leave_failed_resume(suspend_context: SuspendContext) {
    let _ = suspend_context;
}

#[scenario(
    path = "tests/features/suspend.feature",
    name = "Leave a deleting stack alone"
)]
fn scenario_leave_deleting_stack(suspend_context: SuspendContext) {
    let _ = suspend_context;
}

#[scenario(
    path = "tests/features/suspend.feature",
    name = "Suspend a created stack by name"
)]
fn scenario_suspend_created_stack(suspend_context: SuspendContext) {
    let _ = suspend_context;
}

#[scenario(
    path = "tests/features/suspend.feature",
    name = "Suspend a resumed stack by name"
)]
fn scenario_suspend_resumed_stack(suspend_context: SuspendContext) {
    let _ = suspend_context;
}

#[scenario(
    path = "tests/features/suspend.feature",
    name = "Suspend a stack once its creation completes"
)]
fn scenario_suspend_after_creation(suspend_context: SuspendContext) {
    let _ = suspend_context;
}

#[scenario(
    path = "tests/features/suspend.feature",
    name = "Give up when creation never settles"
)]
fn scenario_give_up_on_unsettled_creation(suspend_context: SuspendContext) {
    let _ = suspend_context;
}

#[scenario(
    path = "tests/features/suspend.feature",
    name = "Abandon a suspend that never completes without deleting"
)]
fn scenario_abandon_unfinished_suspend(suspend_context: SuspendContext) {
    let _ = suspend_context;
}
