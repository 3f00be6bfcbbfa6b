//! Bounded status polling.
//!
//! A poll re-fetches a stack until it leaves every `_IN_PROGRESS` state or the
//! [`RetryBudget`] runs out. Running out is not an error: it yields
//! [`PollOutcome::TimedOut`] and the caller decides what to do with a stack
//! that never settled.

use std::time::Duration;

use tracing::debug;

use crate::backend::{Clock, StackBackend};
use crate::stack::{Stack, StackLookup, StackStatus, StatusClass, classify_status};

/// Default number of re-fetches after the first observation.
pub const DEFAULT_MAX_RETRIES: u32 = 120;

/// Default pause between two fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Iteration bound and constant sleep interval for one poll.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryBudget {
    max_retries: u32,
    interval: Duration,
}

impl RetryBudget {
    /// Creates a budget allowing `max_retries` re-fetches spaced by `interval`.
    #[must_use]
    pub const fn new(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
        }
    }

    /// Number of re-fetches allowed after the first observation.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Pause between two fetches.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Total number of fetches a poll may perform.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL)
    }
}

/// Result of a poll.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PollOutcome {
    /// The stack reached a `_COMPLETE` or `_FAILED` status.
    Stable(Stack),
    /// The stack does not exist.
    Absent,
    /// The budget ran out; carries the last in-progress snapshot.
    TimedOut(Stack),
}

impl PollOutcome {
    /// Returns the last observed status, or `None` when the stack is absent.
    #[must_use]
    pub const fn status(&self) -> Option<StackStatus> {
        match self {
            Self::Stable(stack) | Self::TimedOut(stack) => Some(stack.status),
            Self::Absent => None,
        }
    }
}

/// Polls stacks through a backend, pausing on a clock between fetches.
#[derive(Debug)]
pub struct Poller<'a, B, C> {
    backend: &'a B,
    clock: &'a C,
    budget: RetryBudget,
}

impl<'a, B, C> Poller<'a, B, C>
where
    B: StackBackend,
    C: Clock,
{
    /// Creates a poller over borrowed collaborators.
    #[must_use]
    pub const fn new(backend: &'a B, clock: &'a C, budget: RetryBudget) -> Self {
        Self {
            backend,
            clock,
            budget,
        }
    }

    /// Fetches `stack_name` until it is stable, absent, or the budget runs out.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by [`StackBackend::get_stack`].
    pub async fn poll(&self, stack_name: &str) -> Result<PollOutcome, B::Error> {
        let first = self.backend.get_stack(stack_name).await?;
        self.settle(stack_name, first).await
    }

    /// Waits out a lookup the caller already made.
    ///
    /// `first` counts as the first fetch of the budget, so only `max_retries`
    /// further fetches are made.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by [`StackBackend::get_stack`].
    pub async fn settle(
        &self,
        stack_name: &str,
        first: StackLookup,
    ) -> Result<PollOutcome, B::Error> {
        let attempts = self.budget.max_attempts();
        let mut lookup = first;
        let mut attempt = 1;

        loop {
            let StackLookup::Found(stack) = lookup else {
                debug!(stack = stack_name, attempt, "stack not found");
                return Ok(PollOutcome::Absent);
            };
            debug!(stack = stack_name, attempt, status = %stack.status, "observed stack status");

            if classify_status(stack.status) != StatusClass::InProgress {
                return Ok(PollOutcome::Stable(stack));
            }
            if attempt >= attempts {
                return Ok(PollOutcome::TimedOut(stack));
            }

            self.clock.sleep(self.budget.interval()).await;
            lookup = self.backend.get_stack(stack_name).await?;
            attempt = attempt.saturating_add(1);
        }
    }
}
