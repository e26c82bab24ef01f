//! Visibility predicates
//!
//! A small boolean expression tree evaluated against a strict path
//! accessor. Predicates are compiled from [`PredicateDecl`] by the schema,
//! which resolves every referenced path and coerces equality literals.
//!
//! [`PredicateDecl`]: crate::PredicateDecl

use crate::path::FieldPath;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

/// Read access to field values
pub trait ValueSource {
    /// Stored value at a concrete path, `None` when unset
    fn value_at(&self, path: &FieldPath) -> Option<&Value>;
}

impl ValueSource for HashMap<FieldPath, Value> {
    fn value_at(&self, path: &FieldPath) -> Option<&Value> {
        self.get(path)
    }
}

impl ValueSource for BTreeMap<FieldPath, Value> {
    fn value_at(&self, path: &FieldPath) -> Option<&Value> {
        self.get(path)
    }
}

/// Compiled visibility predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Referenced field has a truthy effective value
    Truthy(FieldPath),
    /// Referenced field's effective value equals the literal
    Equals(FieldPath, Value),
    /// Every child holds (empty: true)
    All(Vec<Predicate>),
    /// At least one child holds (empty: false)
    Any(Vec<Predicate>),
    /// Child does not hold
    Not(Box<Predicate>),
}

impl Predicate {
    /// Evaluate using `lookup` to fetch effective values
    pub fn evaluate<'a, F>(&self, lookup: &F) -> bool
    where
        F: Fn(&FieldPath) -> Option<&'a Value>,
    {
        match self {
            Self::Truthy(path) => lookup(path).is_some_and(Value::is_truthy),
            Self::Equals(path, expected) => lookup(path).is_some_and(|v| v == expected),
            Self::All(children) => children.iter().all(|c| c.evaluate(lookup)),
            Self::Any(children) => children.iter().any(|c| c.evaluate(lookup)),
            Self::Not(child) => !child.evaluate(lookup),
        }
    }

    /// Paths referenced anywhere in the tree
    #[must_use]
    pub fn references(&self) -> Vec<&FieldPath> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a FieldPath>) {
        match self {
            Self::Truthy(path) | Self::Equals(path, _) => out.push(path),
            Self::All(children) | Self::Any(children) => {
                for child in children {
                    child.collect_references(out);
                }
            }
            Self::Not(child) => child.collect_references(out),
        }
    }
}
