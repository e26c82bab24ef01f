//! Schema error types

use crate::field::ConstraintViolation;
use crate::path::PathError;

/// Errors raised while loading or querying the schema
///
/// Load-time variants are fatal: a schema that fails to load never
/// serves a session.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Path is not declared
    #[error("undeclared path: {0}")]
    Undeclared(String),

    /// Path does not address a repeatable group
    #[error("not a list group: {0}")]
    NotAGroup(String),

    /// Malformed path in a declaration
    #[error("invalid path '{path}': {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PathError,
    },

    /// Declaration syntax error
    #[error("schema parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Field declared twice
    #[error("duplicate declaration: {0}")]
    Duplicate(String),

    /// Predicate references a path that is not declared
    #[error("predicate on {field} references undeclared path {reference}")]
    DanglingReference { field: String, reference: String },

    /// Predicate references a list group or an item field
    #[error("predicate on {field} references list data {reference}")]
    ListReference { field: String, reference: String },

    /// Equality literal does not fit the referenced field
    #[error("predicate on {field}: literal for {reference} is invalid: {violation}")]
    InvalidLiteral {
        field: String,
        reference: String,
        #[source]
        violation: ConstraintViolation,
    },

    /// Visibility predicates depend on each other circularly
    #[error("predicate cycle through {0}")]
    PredicateCycle(String),

    /// Lists may not contain lists
    #[error("nested list group: {0}")]
    NestedList(String),

    /// Declaration is internally inconsistent
    #[error("invalid declaration for {field}: {reason}")]
    InvalidDeclaration { field: String, reason: String },
}
