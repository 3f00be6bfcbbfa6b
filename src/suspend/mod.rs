//! Best-effort stack suspension.
//!
//! Suspending is housekeeping that saves cost between sessions. A stack is
//! only suspended when it is up (or about to be), and nothing that goes wrong
//! along the way is surfaced to the caller: errors, failures, and timeouts are
//! logged and summarised in the returned [`SuspendResult`].

use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{Clock, StackBackend, TokioClock};
use crate::poll::{PollOutcome, Poller, RetryBudget};
use crate::stack::{StackLookup, StackStatus};

/// What a suspend run ended up doing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuspendStatus {
    /// The stack reached `SUSPEND_COMPLETE`.
    Suspended,
    /// The stack was absent, broken, or already suspended; nothing was done.
    Skipped,
    /// A suspend was attempted or awaited but did not complete.
    Abandoned,
}

/// Summary of a suspend run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct SuspendResult {
    /// What the run did.
    pub status: SuspendStatus,
    /// Last stack status observed, if the stack was found.
    pub stack_status: Option<StackStatus>,
}

impl SuspendResult {
    const fn new(status: SuspendStatus, stack_status: Option<StackStatus>) -> Self {
        Self {
            status,
            stack_status,
        }
    }
}

/// Suspends stacks through a [`StackBackend`].
#[derive(Debug)]
pub struct SuspendOrchestrator<B, C = TokioClock> {
    backend: B,
    clock: C,
    budget: RetryBudget,
}

impl<B: StackBackend> SuspendOrchestrator<B, TokioClock> {
    /// Creates an orchestrator that sleeps on the Tokio timer.
    #[must_use]
    pub fn with_tokio_clock(backend: B) -> Self {
        Self::new(backend, TokioClock)
    }
}

impl<B, C> SuspendOrchestrator<B, C>
where
    B: StackBackend,
    C: Clock,
{
    /// Creates an orchestrator with the default retry budget.
    #[must_use]
    pub fn new(backend: B, clock: C) -> Self {
        Self {
            backend,
            clock,
            budget: RetryBudget::default(),
        }
    }

    /// Overrides the budget used for every poll of a suspend run.
    #[must_use]
    pub const fn with_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Suspends `stack_name` if it is up.
    ///
    /// A stack still being created (or resumed) is waited for first. Absent,
    /// failed, suspending, and suspended stacks are left alone.
    ///
    /// This never fails: suspension is best-effort housekeeping, so backend
    /// errors, failed suspends, and timeouts are logged and reported as
    /// [`SuspendStatus::Abandoned`] rather than returned as errors.
    pub async fn suspend(&self, stack_name: &str) -> SuspendResult {
        let lookup = match self.backend.get_stack(stack_name).await {
            Ok(lookup) => lookup,
            Err(err) => {
                warn!(stack = stack_name, error = %err, "could not look up stack to suspend");
                return SuspendResult::new(SuspendStatus::Abandoned, None);
            }
        };
        let StackLookup::Found(stack) = lookup else {
            info!(stack = stack_name, "stack not found; nothing to suspend");
            return SuspendResult::new(SuspendStatus::Skipped, None);
        };

        match stack.status {
            StackStatus::CREATE_COMPLETE | StackStatus::RESUME_COMPLETE => {
                self.suspend_and_wait(stack_name).await
            }
            StackStatus::CREATE_IN_PROGRESS | StackStatus::RESUME_IN_PROGRESS => {
                self.wait_then_suspend(stack_name).await
            }
            status => {
                info!(stack = stack_name, status = %status, "stack not eligible for suspension");
                SuspendResult::new(SuspendStatus::Skipped, Some(status))
            }
        }
    }

    async fn wait_then_suspend(&self, stack_name: &str) -> SuspendResult {
        match self.poll(stack_name).await {
            Some(PollOutcome::Stable(stack)) if stack.status.is_up() => {
                self.suspend_and_wait(stack_name).await
            }
            Some(PollOutcome::TimedOut(stack)) => {
                warn!(
                    stack = stack_name,
                    status = %stack.status,
                    "gave up waiting for stack before suspending"
                );
                SuspendResult::new(SuspendStatus::Abandoned, Some(stack.status))
            }
            Some(outcome) => {
                info!(
                    stack = stack_name,
                    status = %status_label(outcome.status()),
                    "stack settled in a state that cannot be suspended"
                );
                SuspendResult::new(SuspendStatus::Skipped, outcome.status())
            }
            None => SuspendResult::new(SuspendStatus::Abandoned, None),
        }
    }

    async fn suspend_and_wait(&self, stack_name: &str) -> SuspendResult {
        if let Err(err) = self.backend.suspend_stack(stack_name).await {
            warn!(stack = stack_name, error = %err, "suspend request failed");
            return SuspendResult::new(SuspendStatus::Abandoned, None);
        }
        info!(stack = stack_name, "requested stack suspension");

        match self.poll(stack_name).await {
            Some(PollOutcome::Stable(stack)) if stack.status == StackStatus::SUSPEND_COMPLETE => {
                info!(stack = stack_name, "stack suspended");
                SuspendResult::new(SuspendStatus::Suspended, Some(stack.status))
            }
            Some(outcome) => {
                warn!(
                    stack = stack_name,
                    status = %status_label(outcome.status()),
                    "stack did not finish suspending"
                );
                SuspendResult::new(SuspendStatus::Abandoned, outcome.status())
            }
            None => SuspendResult::new(SuspendStatus::Abandoned, None),
        }
    }

    async fn poll(&self, stack_name: &str) -> Option<PollOutcome> {
        match Poller::new(&self.backend, &self.clock, self.budget)
            .poll(stack_name)
            .await
        {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                warn!(stack = stack_name, error = %err, "could not poll stack status");
                None
            }
        }
    }
}

fn status_label(status: Option<StackStatus>) -> String {
    status.map_or_else(|| String::from("ABSENT"), |value| value.to_string())
}
