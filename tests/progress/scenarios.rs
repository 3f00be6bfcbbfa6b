//! BDD scenarios for grading stacks over SSH.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ProgressContext, progress_context};

#[scenario(
    path = "tests/features/progress.feature",
    name = "Grade a batch over one connection"
)]
fn scenario_grade_over_one_connection(progress_context: ProgressContext) {
    let _ = progress_context;
}

#[scenario(
    path = "tests/features/progress.feature",
    name = "An unreachable host is a transport error"
)]
fn scenario_unreachable_host(progress_context: ProgressContext) {
    let _ = progress_context;
}

#[scenario(
    path = "tests/features/progress.feature",
    name = "A dropped connection aborts the batch"
)]
fn scenario_dropped_connection(progress_context: ProgressContext) {
    let _ = progress_context;
}

#[scenario(
    path = "tests/features/progress.feature",
    name = "An empty batch still opens and closes a session"
)]
fn scenario_empty_batch(progress_context: ProgressContext) {
    let _ = progress_context;
}
