//! Per-batch results

use crate::session::SessionId;
use bail_schema::FieldPath;
use bail_state::{MutationError, MutationOutcome};
use serde::{Deserialize, Serialize};

/// What happened to one operation of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OpStatus {
    Applied { outcome: MutationOutcome },
    Rejected { code: String, message: String },
}

/// Result of one operation, in batch order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpResult {
    /// Position in the batch
    pub index: usize,
    /// Operation name
    pub op: String,
    /// Path or group the operation targeted
    pub target: FieldPath,
    #[serde(flatten)]
    pub status: OpStatus,
}

impl OpResult {
    pub(crate) fn applied(
        index: usize,
        op: &str,
        target: FieldPath,
        outcome: MutationOutcome,
    ) -> Self {
        Self {
            index,
            op: op.to_string(),
            target,
            status: OpStatus::Applied { outcome },
        }
    }

    pub(crate) fn rejected(
        index: usize,
        op: &str,
        target: FieldPath,
        error: &MutationError,
    ) -> Self {
        Self {
            index,
            op: op.to_string(),
            target,
            status: OpStatus::Rejected {
                code: error.code().to_string(),
                message: error.to_string(),
            },
        }
    }

    #[inline]
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self.status, OpStatus::Applied { .. })
    }
}

/// Outcome of `apply_mutation_batch`
///
/// Operations are independent: a rejected one never undoes earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub session: SessionId,
    /// Session version after the batch
    pub version: u64,
    pub results: Vec<OpResult>,
}

impl BatchReport {
    /// Rejected operations
    pub fn errors(&self) -> impl Iterator<Item = &OpResult> {
        self.results.iter().filter(|r| !r.is_applied())
    }

    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_applied()).count()
    }

    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}
