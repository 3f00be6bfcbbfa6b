//! Wire types for `openstack stack` JSON output.

use serde::Deserialize;
use serde_json::Value;

use crate::stack::{Stack, StackStatus, StatusParseError};

/// Optional selection of the cloud the `openstack` client talks to.
///
/// Credentials themselves stay with the client (`OS_*` variables,
/// `clouds.yaml`); only the selection is passed through.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AuthContext {
    /// Named cloud from `clouds.yaml` (`--os-cloud`).
    pub os_cloud: Option<String>,
    /// Identity endpoint override (`--os-auth-url`).
    pub os_auth_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(super) struct HeatStack {
    pub(super) id: String,
    pub(super) stack_name: String,
    pub(super) stack_status: String,
    #[serde(default)]
    pub(super) outputs: Vec<HeatOutput>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(super) struct HeatOutput {
    pub(super) output_key: String,
    #[serde(default)]
    pub(super) output_value: Value,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub(super) struct HeatCreated {
    pub(super) id: String,
}

impl HeatStack {
    /// Converts the wire payload into a [`Stack`] snapshot.
    ///
    /// String outputs are kept verbatim, null outputs are dropped, and any
    /// other value is kept as its JSON text.
    pub(super) fn into_stack(self) -> Result<Stack, StatusParseError> {
        let status = self.stack_status.parse::<StackStatus>()?;
        let stack = Stack::new(self.id, self.stack_name, status);
        Ok(self
            .outputs
            .into_iter()
            .fold(stack, |acc, output| match output.output_value {
                Value::Null => acc,
                Value::String(text) => acc.with_output(output.output_key, text),
                other => acc.with_output(output.output_key, other.to_string()),
            }))
    }
}
