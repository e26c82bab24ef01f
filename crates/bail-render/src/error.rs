//! Renderer error types

use bail_schema::SchemaError;

/// The outline does not agree with the schema
///
/// Never raised for missing user data.
#[derive(Debug, thiserror::Error)]
pub enum RenderStructuralError {
    /// Outline syntax error
    #[error("outline parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Node with zero or several kinds, or a kind not allowed where it is
    #[error("malformed outline node at {at}: {reason}")]
    MalformedNode { at: String, reason: String },

    /// Outline references an undeclared path
    #[error("outline references undeclared path {0}")]
    UndeclaredPath(String),

    /// `repeat` over a field that is not a list group
    #[error("outline repeats over non-group {0}")]
    NotAGroup(String),

    /// `field` placeholder on a list group
    #[error("outline prints list group {0} as a field")]
    NotALeaf(String),

    /// Clause condition failed to compile
    #[error("invalid condition at {at}: {source}")]
    Condition {
        at: String,
        #[source]
        source: SchemaError,
    },

    /// Outline was checked against another schema
    #[error("outline checked against schema {expected}, rendering with {actual}")]
    SchemaMismatch { expected: String, actual: String },
}
