//! Mutation protocol
//!
//! The closed set of operations an agent may issue against a document.
//! Each operation has a fixed argument shape and is applied by one
//! exhaustive match.
//!
//! ```json
//! {"op": "set", "path": "garanties.montant_depot_garantie", "value": "1500"}
//! {"op": "append_list_item", "group": "designation_parties.locataires"}
//! {"op": "remove_list_item", "group": "designation_parties.locataires", "index": 0}
//! {"op": "clear", "path": "signature.ville"}
//! ```

use crate::error::MutationError;
use crate::state::DocumentState;
use bail_schema::{FieldPath, Schema, Value};
use serde::{Deserialize, Serialize};

/// One agent-issued operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationOp {
    /// Coerce and store a value
    Set {
        path: FieldPath,
        value: serde_json::Value,
    },
    /// Extend a repeatable group by one item
    #[serde(alias = "appendListItem")]
    AppendListItem { group: FieldPath },
    /// Remove an item and renumber the rest
    #[serde(alias = "removeListItem")]
    RemoveListItem { group: FieldPath, index: usize },
    /// Return a field to unset
    Clear { path: FieldPath },
}

impl MutationOp {
    /// Build a `set` operation
    #[must_use]
    pub fn set(path: FieldPath, value: impl Into<serde_json::Value>) -> Self {
        Self::Set {
            path,
            value: value.into(),
        }
    }

    /// Operation name, as on the wire
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::AppendListItem { .. } => "append_list_item",
            Self::RemoveListItem { .. } => "remove_list_item",
            Self::Clear { .. } => "clear",
        }
    }

    /// Path the operation targets
    #[must_use]
    pub fn target(&self) -> &FieldPath {
        match self {
            Self::Set { path, .. } | Self::Clear { path } => path,
            Self::AppendListItem { group } | Self::RemoveListItem { group, .. } => group,
        }
    }

    /// Apply to a state
    ///
    /// On error the state is unchanged.
    ///
    /// # Errors
    /// Returns the per-operation [`MutationError`]
    pub fn apply(
        &self,
        state: &mut DocumentState,
        schema: &Schema,
    ) -> Result<MutationOutcome, MutationError> {
        let outcome = match self {
            Self::Set { path, value } => {
                let value = state.set(schema, path, value)?;
                MutationOutcome::Set {
                    path: path.clone(),
                    value,
                }
            }
            Self::AppendListItem { group } => {
                let index = state.append_list_item(schema, group)?;
                MutationOutcome::Appended {
                    group: group.clone(),
                    index,
                }
            }
            Self::RemoveListItem { group, index } => {
                state.remove_list_item(schema, group, *index)?;
                MutationOutcome::Removed {
                    group: group.clone(),
                    index: *index,
                }
            }
            Self::Clear { path } => {
                state.clear(schema, path)?;
                MutationOutcome::Cleared { path: path.clone() }
            }
        };
        Ok(outcome)
    }
}

/// Result of a successful operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// Value stored, in its coerced form
    Set { path: FieldPath, value: Value },
    /// Item appended at `index`
    Appended { group: FieldPath, index: usize },
    /// Item removed; later items shifted down
    Removed { group: FieldPath, index: usize },
    /// Field returned to unset
    Cleared { path: FieldPath },
}
