//! Shared fixtures for suspend BDD scenarios.

use std::time::Duration;

use labstack::test_support::{RecordingClock, ScriptedBackend};
use labstack::{RetryBudget, SuspendOrchestrator, SuspendResult};
use rstest::fixture;
use thiserror::Error;

pub const STACK_NAME: &str = "lab-7";
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum StepError {
    #[error("suspend could not run: {0}")]
    Runtime(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[derive(Clone, Debug)]
pub struct SuspendContext {
    pub backend: ScriptedBackend,
    pub clock: RecordingClock,
    pub outcome: Option<SuspendResult>,
}

impl SuspendContext {
    pub fn orchestrator(&self) -> SuspendOrchestrator<ScriptedBackend, RecordingClock> {
        SuspendOrchestrator::new(self.backend.clone(), self.clock.clone())
            .with_budget(RetryBudget::new(2, POLL_INTERVAL))
    }

    pub fn outcome(&self) -> Result<&SuspendResult, StepError> {
        self.outcome
            .as_ref()
            .ok_or_else(|| StepError::Assertion(String::from("missing suspend outcome")))
    }
}

#[fixture]
pub fn suspend_context() -> SuspendContext {
    SuspendContext {
        backend: ScriptedBackend::new(),
        clock: RecordingClock::new(),
        outcome: None,
    }
}

pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), StepError> {
    if condition {
        Ok(())
    } else {
        Err(StepError::Assertion(message()))
    }
}
