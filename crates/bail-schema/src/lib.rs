//! Bail Schema Model
//!
//! Declarative, read-only registry of every field of a furnished-lease
//! contract.
//!
//! # Core Concepts
//!
//! - [`Schema`]: validated field registry, shared by every session
//! - [`FieldSpec`]: one declared field (type, constraints, visibility)
//! - [`FieldPath`]: canonical address (`section.field`, `group[i].field`)
//! - [`Value`]: typed field value produced by coercion
//! - [`Predicate`]: visibility expression over other fields
//!
//! # Example
//!
//! ```rust,ignore
//! use bail_schema::{FieldPath, Schema};
//!
//! let schema = Schema::furnished_lease()?;
//! let path: FieldPath = "garanties.montant_depot_garantie".parse()?;
//! let spec = schema.resolve(&path)?;
//! let value = spec.kind().coerce(&serde_json::json!("1 500,00"))?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod decl;
mod digest;
mod error;
mod field;
mod path;
mod predicate;
mod schema;
mod value;

pub use decl::{EqualsDecl, FieldDecl, KindDecl, PredicateDecl, SchemaDecl, SectionDecl};
pub use digest::{ContentDigest, DigestError};
pub use error::SchemaError;
pub use field::{
    ConstraintViolation, DecimalRule, FieldKind, FieldSpec, ListRule, TextRule, Unit,
    DEFAULT_MAX_ITEMS,
};
pub use path::{FieldPath, PathError, Segment};
pub use predicate::{Predicate, ValueSource};
pub use schema::{Schema, SectionSpec, FURNISHED_LEASE_SOURCE};
pub use value::Value;
