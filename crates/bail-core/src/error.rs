//! Error types for the session orchestrator

use crate::report::BatchReport;
use bail_render::RenderStructuralError;
use bail_schema::SchemaError;
use bail_state::RestoreError;

/// Errors raised by a [`crate::SessionStore`]
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Underlying I/O failed
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded
    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored record disagrees with the schema
    #[error("session {session} is corrupt: {source}")]
    Corrupt {
        session: String,
        #[source]
        source: RestoreError,
    },

    /// Stored record belongs to another session
    #[error("record for session {found} stored under {requested}")]
    Misfiled { requested: String, found: String },

    /// Backend-specific failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Main orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Session id is empty, too long or has forbidden characters
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// Batch refused before any operation ran
    #[error("batch of {size} operations exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// Unknown top-level section
    #[error("unknown section: {0}")]
    UnknownSection(String),

    /// Load or save failed
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Operations were applied in memory but the snapshot was not saved
    #[error("batch applied but not saved: {source}")]
    PersistFailed {
        #[source]
        source: PersistenceError,
        /// Per-operation results of the applied batch
        report: Box<BatchReport>,
    },

    /// Outline and schema disagree
    #[error("render error: {0}")]
    Render(#[from] RenderStructuralError),

    /// Schema failed to load, or a path is undeclared
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl OrchestratorError {
    /// Whether retrying the same call may succeed
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Persistence(PersistenceError::Io(_) | PersistenceError::Backend(_))
                | Self::PersistFailed { .. }
        )
    }
}
