//! Launch orchestration: bring a named stack to a running, verified state.
//!
//! The orchestrator looks the stack up once and picks the action its status
//! calls for (create, resume, or nothing), waits for it, and finally verifies
//! the stack. A stack already mid-create or mid-resume gets no new action; it
//! is waited for and judged where it lands. Stacks that end up failed or never
//! settle are deleted on a best-effort basis so they do not stay allocated,
//! and the caller always receives a [`LaunchResult`] describing what happened.

use std::fmt::Display;
use std::net::IpAddr;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{Clock, StackBackend, StackTemplate, StackVerifier, TokioClock};
use crate::poll::{PollOutcome, Poller, RetryBudget};
use crate::stack::{Stack, StackAction, StackLookup, StackState, StackStatus};

/// Inputs for a launch.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LaunchRequest {
    /// Unique name of the stack to launch.
    pub stack_name: String,
    /// Template used when the stack has to be created.
    pub template: StackTemplate,
    /// Account the verifier logs in as.
    pub user: String,
}

impl LaunchRequest {
    /// Builds a launch request.
    #[must_use]
    pub fn new(
        stack_name: impl Into<String>,
        template: StackTemplate,
        user: impl Into<String>,
    ) -> Self {
        Self {
            stack_name: stack_name.into(),
            template,
            user: user.into(),
        }
    }
}

/// Structured outcome of a launch.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LaunchResult {
    /// Final stack status; `CREATE_FAILED` when waiting timed out.
    pub status: StackStatus,
    /// Diagnostic describing a failure.
    pub error: Option<String>,
    /// Address the verified stack is reachable on.
    pub ip: Option<IpAddr>,
}

impl LaunchResult {
    fn failed(status: StackStatus, error: String) -> Self {
        Self {
            status,
            error: Some(error),
            ip: None,
        }
    }

    /// Returns `true` when the stack is up and passed verification.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none() && self.status.is_up()
    }
}

/// Unexpected collaborator failures raised during a launch.
#[derive(Debug, Error)]
pub enum LaunchError<BackendError>
where
    BackendError: std::error::Error + 'static,
{
    /// Raised when the stack status cannot be fetched.
    #[error("failed to look up stack {stack}: {source}")]
    Lookup {
        /// Stack being launched.
        stack: String,
        /// Provider-specific error.
        #[source]
        source: BackendError,
    },
    /// Raised when the create call is rejected.
    #[error("failed to create stack {stack}: {source}")]
    Create {
        /// Stack being launched.
        stack: String,
        /// Provider-specific error.
        #[source]
        source: BackendError,
    },
    /// Raised when the resume call is rejected.
    #[error("failed to resume stack {stack}: {source}")]
    Resume {
        /// Stack being launched.
        stack: String,
        /// Provider-specific error.
        #[source]
        source: BackendError,
    },
}

/// Action chosen for a stack that has settled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum LaunchStep {
    Create,
    Resume,
    Ready,
    Abandon,
}

/// Only a stack caught suspending or deleting is planned again once it
/// settles; any other in-progress stack is judged on where it lands.
const fn replans_after_settling(status: StackStatus) -> bool {
    matches!(status.action, StackAction::Suspend | StackAction::Delete)
}

const fn plan(status: StackStatus) -> LaunchStep {
    match status {
        StackStatus::CREATE_FAILED | StackStatus::DELETE_COMPLETE | StackStatus::DELETE_FAILED => {
            LaunchStep::Create
        }
        StackStatus::SUSPEND_COMPLETE
        | StackStatus::SUSPEND_FAILED
        | StackStatus::RESUME_FAILED => LaunchStep::Resume,
        StackStatus::CREATE_COMPLETE | StackStatus::RESUME_COMPLETE => LaunchStep::Ready,
        _ => LaunchStep::Abandon,
    }
}

/// Drives a stack to a running state through a [`StackBackend`].
#[derive(Debug)]
pub struct LaunchOrchestrator<B, V, C = TokioClock> {
    backend: B,
    verifier: V,
    clock: C,
    budget: RetryBudget,
}

impl<B, V> LaunchOrchestrator<B, V, TokioClock>
where
    B: StackBackend,
    V: StackVerifier,
{
    /// Creates an orchestrator that sleeps on the Tokio timer.
    #[must_use]
    pub fn with_tokio_clock(backend: B, verifier: V) -> Self {
        Self::new(backend, verifier, TokioClock)
    }
}

impl<B, V, C> LaunchOrchestrator<B, V, C>
where
    B: StackBackend,
    V: StackVerifier,
    C: Clock,
{
    /// Creates an orchestrator with the default retry budget.
    #[must_use]
    pub fn new(backend: B, verifier: V, clock: C) -> Self {
        Self {
            backend,
            verifier,
            clock,
            budget: RetryBudget::default(),
        }
    }

    /// Overrides the budget used for every poll of a launch.
    #[must_use]
    pub const fn with_budget(mut self, budget: RetryBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Brings the requested stack up and verifies it.
    ///
    /// Failed, timed-out, or vanished stacks are reported through the returned
    /// [`LaunchResult`], never as an `Err`. A stack that is already up is only
    /// verified; no mutating call is issued.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when the backend fails to report a status or
    /// rejects a create or resume call.
    pub async fn launch(
        &self,
        request: &LaunchRequest,
    ) -> Result<LaunchResult, LaunchError<B::Error>> {
        let name = request.stack_name.as_str();
        info!(stack = name, "launching stack");

        let initial = self
            .backend
            .get_stack(name)
            .await
            .map_err(|source| LaunchError::Lookup {
                stack: name.to_owned(),
                source,
            })?;

        match initial {
            StackLookup::NotFound => {
                let outcome = self.create(request).await?;
                Ok(self.conclude(request, outcome).await)
            }
            StackLookup::Found(stack) if stack.status.state == StackState::InProgress => {
                let replans = replans_after_settling(stack.status);
                info!(stack = name, status = %stack.status, "waiting for stack to settle");
                match self.settle(name, StackLookup::Found(stack)).await? {
                    PollOutcome::Stable(settled) if replans => self.act(request, settled).await,
                    PollOutcome::Absent if replans => {
                        let outcome = self.create(request).await?;
                        Ok(self.conclude(request, outcome).await)
                    }
                    outcome => Ok(self.conclude(request, outcome).await),
                }
            }
            StackLookup::Found(stack) => self.act(request, stack).await,
        }
    }

    /// Issues the action a stable stack calls for and reports the outcome.
    async fn act(
        &self,
        request: &LaunchRequest,
        stack: Stack,
    ) -> Result<LaunchResult, LaunchError<B::Error>> {
        let name = request.stack_name.as_str();
        let outcome = match plan(stack.status) {
            LaunchStep::Create => self.create(request).await?,
            LaunchStep::Resume => self.resume(name, &stack).await?,
            LaunchStep::Ready => PollOutcome::Stable(stack),
            LaunchStep::Abandon => {
                let message = format!("stack {name} is in unexpected status {}", stack.status);
                let error = self.delete_with_note(&stack, message).await;
                return Ok(LaunchResult::failed(StackStatus::CREATE_FAILED, error));
            }
        };
        Ok(self.conclude(request, outcome).await)
    }

    async fn settle(
        &self,
        name: &str,
        first: StackLookup,
    ) -> Result<PollOutcome, LaunchError<B::Error>> {
        Poller::new(&self.backend, &self.clock, self.budget)
            .settle(name, first)
            .await
            .map_err(|source| LaunchError::Lookup {
                stack: name.to_owned(),
                source,
            })
    }

    async fn poll(&self, name: &str) -> Result<PollOutcome, LaunchError<B::Error>> {
        Poller::new(&self.backend, &self.clock, self.budget)
            .poll(name)
            .await
            .map_err(|source| LaunchError::Lookup {
                stack: name.to_owned(),
                source,
            })
    }

    async fn create(&self, request: &LaunchRequest) -> Result<PollOutcome, LaunchError<B::Error>> {
        let name = request.stack_name.as_str();
        let id = self
            .backend
            .create_stack(name, &request.template)
            .await
            .map_err(|source| LaunchError::Create {
                stack: name.to_owned(),
                source,
            })?;
        info!(stack = name, id = %id, "requested stack creation");
        self.poll(name).await
    }

    async fn resume(
        &self,
        name: &str,
        stack: &Stack,
    ) -> Result<PollOutcome, LaunchError<B::Error>> {
        self.backend
            .resume_stack(&stack.id)
            .await
            .map_err(|source| LaunchError::Resume {
                stack: name.to_owned(),
                source,
            })?;
        info!(stack = name, id = %stack.id, from = %stack.status, "requested stack resume");
        self.poll(name).await
    }

    async fn conclude(&self, request: &LaunchRequest, outcome: PollOutcome) -> LaunchResult {
        let name = request.stack_name.as_str();
        match outcome {
            PollOutcome::Stable(stack) if stack.status.is_up() => {
                let verification = self.verifier.verify(&stack, name, &request.user).await;
                if let Some(error) = verification.error.as_deref() {
                    warn!(stack = name, status = %verification.status, error, "stack verification failed");
                } else {
                    info!(stack = name, status = %verification.status, "stack is ready");
                }
                LaunchResult {
                    status: verification.status,
                    error: verification.error,
                    ip: verification.address,
                }
            }
            PollOutcome::Stable(stack) if stack.status.state == StackState::Failed => {
                let message = format!("stack {name} ended in {}", stack.status);
                let error = self.delete_with_note(&stack, message).await;
                LaunchResult::failed(stack.status, error)
            }
            PollOutcome::Stable(stack) => {
                let message = format!("stack {name} settled in unexpected status {}", stack.status);
                let error = self.delete_with_note(&stack, message).await;
                LaunchResult::failed(StackStatus::CREATE_FAILED, error)
            }
            PollOutcome::TimedOut(stack) => self.timed_out(name, &stack).await,
            PollOutcome::Absent => {
                warn!(stack = name, "stack disappeared while launching");
                LaunchResult::failed(
                    StackStatus::CREATE_FAILED,
                    format!("stack {name} disappeared while launching"),
                )
            }
        }
    }

    async fn timed_out(&self, name: &str, stack: &Stack) -> LaunchResult {
        let message = format!(
            "stack {name} still {} after {} status checks",
            stack.status,
            self.budget.max_attempts()
        );
        let error = self.delete_with_note(stack, message).await;
        LaunchResult::failed(StackStatus::CREATE_FAILED, error)
    }

    /// Issues the compensating delete and folds any failure into `message`.
    async fn delete_with_note(&self, stack: &Stack, message: String) -> String {
        warn!(stack = %stack.name, id = %stack.id, reason = %message, "deleting stack");
        let delete_error = self.backend.delete_stack(&stack.id).await.err();
        if let Some(err) = delete_error.as_ref() {
            warn!(stack = %stack.name, id = %stack.id, error = %err, "compensating delete failed");
        }
        append_delete_note(message, delete_error.as_ref())
    }
}

fn append_delete_note<E: Display>(message: String, delete_error: Option<&E>) -> String {
    if let Some(err) = delete_error {
        format!("{message} (delete also failed: {err})")
    } else {
        message
    }
}
