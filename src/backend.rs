//! Collaborator seams used by the orchestrators.
//!
//! The orchestration service, the readiness check and the clock are all
//! injected through the traits in this module so the state machines can be
//! driven by scripted doubles in tests.

use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;

use crate::stack::{Stack, StackLookup, StackStatus};

/// Future returned by backend operations.
pub type BackendFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Future returned by infallible collaborator operations.
pub type PlainFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Template handed to the orchestration service when creating a stack.
///
/// The value is opaque to the orchestrators; the openstack CLI backend
/// interprets it as the path of a template file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackTemplate(String);

impl StackTemplate {
    /// Wraps a template reference.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the template reference.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Asynchronous orchestration API.
///
/// Mutating calls only start the action; their effect is observed later
/// through [`StackBackend::get_stack`].
pub trait StackBackend {
    /// Provider specific error type returned by the backend.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetches the current state of a stack by name or id.
    fn get_stack<'a>(&'a self, name_or_id: &'a str) -> BackendFuture<'a, StackLookup, Self::Error>;

    /// Starts creating a stack and returns the provider-assigned id.
    fn create_stack<'a>(
        &'a self,
        name: &'a str,
        template: &'a StackTemplate,
    ) -> BackendFuture<'a, String, Self::Error>;

    /// Starts deleting a stack.
    fn delete_stack<'a>(&'a self, id: &'a str) -> BackendFuture<'a, (), Self::Error>;

    /// Starts suspending a stack.
    fn suspend_stack<'a>(&'a self, name_or_id: &'a str) -> BackendFuture<'a, (), Self::Error>;

    /// Starts resuming a suspended stack.
    fn resume_stack<'a>(&'a self, name_or_id: &'a str) -> BackendFuture<'a, (), Self::Error>;
}

/// Outcome of an application-level readiness check.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Verification {
    /// Status to report for the stack; a failed check reports the `_FAILED`
    /// counterpart of the API status.
    pub status: StackStatus,
    /// Diagnostic when the check failed.
    pub error: Option<String>,
    /// Address the stack is reachable on.
    pub address: Option<IpAddr>,
}

impl Verification {
    /// Builds a successful verification.
    #[must_use]
    pub const fn passed(status: StackStatus, address: IpAddr) -> Self {
        Self {
            status,
            error: None,
            address: Some(address),
        }
    }

    /// Builds a failed verification for a stack whose API status was `status`.
    #[must_use]
    pub fn failed(status: StackStatus, error: impl Into<String>, address: Option<IpAddr>) -> Self {
        Self {
            status: status.as_failed(),
            error: Some(error.into()),
            address,
        }
    }
}

/// Readiness check run once the API reports a stack as up.
pub trait StackVerifier {
    /// Checks that `stack` is reachable and usable by `user`.
    fn verify<'a>(
        &'a self,
        stack: &'a Stack,
        stack_name: &'a str,
        user: &'a str,
    ) -> PlainFuture<'a, Verification>;
}

/// Source of the pauses between status polls.
pub trait Clock {
    /// Suspends the caller for `duration`.
    fn sleep(&self, duration: Duration) -> PlainFuture<'_, ()>;
}

/// Clock backed by the Tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn sleep(&self, duration: Duration) -> PlainFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}
