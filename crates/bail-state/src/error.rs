//! Mutation and restore errors

use bail_schema::{ConstraintViolation, SchemaError};

/// A value was rejected for a field
///
/// Never accompanied by a state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {path}: {violation}")]
pub struct ValidationError {
    /// Concrete path the value was meant for
    pub path: String,
    /// Violated constraint
    #[source]
    pub violation: ConstraintViolation,
}

/// Errors returned by a single mutation
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// Value rejected by the field's declaration
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// List item does not exist (stale or out-of-range index)
    #[error("no such list item: {path}")]
    NotFound { path: String },

    /// Path not declared, or group operation on a non-group
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl MutationError {
    /// Stable error code for callers
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Schema(_) => "schema",
        }
    }
}

/// One record that failed to restore
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {reason}")]
pub struct RecordProblem {
    /// Persisted key of the record
    pub path: String,
    /// What is wrong with it
    pub reason: String,
}

/// Persisted state is inconsistent with the schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} inconsistent record(s): {}", .problems.len(), summarize(.problems))]
pub struct RestoreError {
    /// Every inconsistent record
    pub problems: Vec<RecordProblem>,
}

fn summarize(problems: &[RecordProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
