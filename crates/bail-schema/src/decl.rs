//! Declarative schema source
//!
//! Serde mirror of the YAML catalog. Declarations are compiled into a
//! [`Schema`](crate::Schema) which validates them as a whole.

use crate::field::Unit;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Root of a schema declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDecl {
    /// Catalog name
    pub name: String,
    /// Top-level sections in document order
    pub sections: Vec<SectionDecl>,
}

/// Top-level section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionDecl {
    /// Section key, first segment of every field path in it
    pub key: String,
    /// Human label
    pub label: String,
    /// Field declarations
    pub fields: Vec<FieldDecl>,
}

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindDecl {
    Text,
    Boolean,
    Decimal,
    Date,
    Enum,
    List,
}

/// One field declaration
///
/// `key` is relative to the section (it may contain dots). Constraint
/// keys only apply to the matching type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: KindDecl,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<PredicateDecl>,

    // text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    // decimal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default)]
    pub unit: Unit,

    // enum
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,

    // list
    #[serde(default)]
    pub min_items: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDecl>,
}

/// Predicate as written in YAML
///
/// Exactly one key must be present:
///
/// ```yaml
/// visible_when:
///   any:
///     - equals: { path: logement.chauffage.mode, value: Collectif }
///     - truthy: logement.eau_chaude.collective
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredicateDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub truthy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<EqualsDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<PredicateDecl>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any: Option<Vec<PredicateDecl>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<PredicateDecl>>,
}

/// Equality check against a literal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EqualsDecl {
    pub path: String,
    pub value: serde_json::Value,
}
