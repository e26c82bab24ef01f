//! Bail Document State
//!
//! The only mutation surface over a session's field values.
//!
//! # Core Concepts
//!
//! - [`DocumentState`]: values of one contract, with a version counter
//! - [`MutationOp`]: closed set of agent operations
//! - [`ValueNode`]: stored value with provenance and last write version
//! - [`PersistedState`]: flat storage layout with re-validating restore

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod mutation;
mod node;
mod persist;
mod state;

pub use error::{MutationError, RecordProblem, RestoreError, ValidationError};
pub use mutation::{MutationOp, MutationOutcome};
pub use node::{FilledBy, ValueNode};
pub use persist::PersistedState;
pub use state::DocumentState;
