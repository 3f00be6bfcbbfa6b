//! Stack model and status classification.
//!
//! The orchestration service reports a stack's state as an `ACTION_STATE`
//! string such as `CREATE_IN_PROGRESS`. [`StackStatus`] parses that string into
//! an action and a state, and [`classify`] maps a lookup result onto the
//! semantic categories the orchestrators reason about.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Operation a stack status refers to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StackAction {
    /// Initial provisioning.
    Create,
    /// Suspension of all stack resources.
    Suspend,
    /// Resumption of a suspended stack.
    Resume,
    /// Teardown.
    Delete,
    /// Template or parameter update.
    Update,
    /// Rollback after a failed create or update.
    Rollback,
    /// Resource health check.
    Check,
    /// Snapshot creation.
    Snapshot,
    /// Adoption of existing resources.
    Adopt,
    /// Restore from a snapshot.
    Restore,
    /// Freshly registered stack that has not started an action yet.
    Init,
}

impl StackAction {
    const ALL: [Self; 11] = [
        Self::Create,
        Self::Suspend,
        Self::Resume,
        Self::Delete,
        Self::Update,
        Self::Rollback,
        Self::Check,
        Self::Snapshot,
        Self::Adopt,
        Self::Restore,
        Self::Init,
    ];

    /// Returns the upper-case token used in status strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Suspend => "SUSPEND",
            Self::Resume => "RESUME",
            Self::Delete => "DELETE",
            Self::Update => "UPDATE",
            Self::Rollback => "ROLLBACK",
            Self::Check => "CHECK",
            Self::Snapshot => "SNAPSHOT",
            Self::Adopt => "ADOPT",
            Self::Restore => "RESTORE",
            Self::Init => "INIT",
        }
    }
}

/// Progress of the action a status refers to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StackState {
    /// The action is still running.
    InProgress,
    /// The action ended in failure.
    Failed,
    /// The action completed successfully.
    Complete,
}

impl StackState {
    const ALL: [Self; 3] = [Self::InProgress, Self::Failed, Self::Complete];

    /// Returns the upper-case suffix used in status strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Failed => "FAILED",
            Self::Complete => "COMPLETE",
        }
    }
}

/// Status reported for a stack, for example `RESUME_COMPLETE`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct StackStatus {
    /// Action the status refers to.
    pub action: StackAction,
    /// Progress of that action.
    pub state: StackState,
}

impl StackStatus {
    /// `CREATE_IN_PROGRESS`.
    pub const CREATE_IN_PROGRESS: Self = Self::new(StackAction::Create, StackState::InProgress);
    /// `CREATE_FAILED`.
    pub const CREATE_FAILED: Self = Self::new(StackAction::Create, StackState::Failed);
    /// `CREATE_COMPLETE`.
    pub const CREATE_COMPLETE: Self = Self::new(StackAction::Create, StackState::Complete);
    /// `SUSPEND_IN_PROGRESS`.
    pub const SUSPEND_IN_PROGRESS: Self = Self::new(StackAction::Suspend, StackState::InProgress);
    /// `SUSPEND_FAILED`.
    pub const SUSPEND_FAILED: Self = Self::new(StackAction::Suspend, StackState::Failed);
    /// `SUSPEND_COMPLETE`.
    pub const SUSPEND_COMPLETE: Self = Self::new(StackAction::Suspend, StackState::Complete);
    /// `RESUME_IN_PROGRESS`.
    pub const RESUME_IN_PROGRESS: Self = Self::new(StackAction::Resume, StackState::InProgress);
    /// `RESUME_FAILED`.
    pub const RESUME_FAILED: Self = Self::new(StackAction::Resume, StackState::Failed);
    /// `RESUME_COMPLETE`.
    pub const RESUME_COMPLETE: Self = Self::new(StackAction::Resume, StackState::Complete);
    /// `DELETE_IN_PROGRESS`.
    pub const DELETE_IN_PROGRESS: Self = Self::new(StackAction::Delete, StackState::InProgress);
    /// `DELETE_FAILED`.
    pub const DELETE_FAILED: Self = Self::new(StackAction::Delete, StackState::Failed);
    /// `DELETE_COMPLETE`.
    pub const DELETE_COMPLETE: Self = Self::new(StackAction::Delete, StackState::Complete);

    /// Builds a status from its parts.
    #[must_use]
    pub const fn new(action: StackAction, state: StackState) -> Self {
        Self { action, state }
    }

    /// Returns `true` for the two states a launched stack is usable in.
    #[must_use]
    pub const fn is_up(self) -> bool {
        matches!(self.state, StackState::Complete)
            && matches!(self.action, StackAction::Create | StackAction::Resume)
    }

    /// Returns the failed status for the same action (`RESUME_COMPLETE` maps
    /// to `RESUME_FAILED`).
    #[must_use]
    pub const fn as_failed(self) -> Self {
        Self::new(self.action, StackState::Failed)
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.action.as_str(), self.state.as_str())
    }
}

/// Raised when a status string is not an `ACTION_STATE` pair.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("unrecognised stack status '{0}'")]
pub struct StatusParseError(pub String);

impl FromStr for StackStatus {
    type Err = StatusParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        for state in StackState::ALL {
            let Some(prefix) = trimmed
                .strip_suffix(state.as_str())
                .and_then(|rest| rest.strip_suffix('_'))
            else {
                continue;
            };
            if let Some(action) = StackAction::ALL
                .into_iter()
                .find(|candidate| candidate.as_str() == prefix)
            {
                return Ok(Self::new(action, state));
            }
        }
        Err(StatusParseError(raw.to_owned()))
    }
}

impl Serialize for StackStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StackStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Snapshot of a stack as reported by the orchestration service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Stack {
    /// Provider-assigned identifier.
    pub id: String,
    /// Unique stack name.
    pub name: String,
    /// Status observed when the snapshot was fetched.
    pub status: StackStatus,
    /// Outputs published by the stack template.
    pub outputs: BTreeMap<String, String>,
}

impl Stack {
    /// Creates a snapshot without outputs.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: StackStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            outputs: BTreeMap::new(),
        }
    }

    /// Adds a template output to the snapshot.
    #[must_use]
    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    /// Returns the value of the named output, if published.
    #[must_use]
    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs.get(key).map(String::as_str)
    }
}

/// Result of looking a stack up by name or id.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StackLookup {
    /// The stack exists.
    Found(Stack),
    /// The service reported that no such stack exists.
    NotFound,
}

impl StackLookup {
    /// Returns the observed status, or `None` when the stack is absent.
    #[must_use]
    pub const fn status(&self) -> Option<StackStatus> {
        match self {
            Self::Found(stack) => Some(stack.status),
            Self::NotFound => None,
        }
    }
}

/// Semantic category of an observed stack status.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusClass {
    /// A `_COMPLETE` status.
    StableOk,
    /// A `_FAILED` status.
    StableFail,
    /// An `_IN_PROGRESS` status; the only class a poll keeps waiting on.
    InProgress,
    /// The stack does not exist.
    Absent,
}

/// Classifies a lookup result.
#[must_use]
pub const fn classify(lookup: &StackLookup) -> StatusClass {
    match lookup {
        StackLookup::NotFound => StatusClass::Absent,
        StackLookup::Found(stack) => classify_status(stack.status),
    }
}

/// Classifies a status observed on an existing stack.
#[must_use]
pub const fn classify_status(status: StackStatus) -> StatusClass {
    match status.state {
        StackState::InProgress => StatusClass::InProgress,
        StackState::Failed => StatusClass::StableFail,
        StackState::Complete => StatusClass::StableOk,
    }
}
