//! Field declarations and value coercion
//!
//! A [`FieldSpec`] declares one field of the document. Its [`FieldKind`]
//! owns the coercion rules that turn an agent-supplied JSON argument into a
//! typed [`Value`], or reject it with a [`ConstraintViolation`].

use crate::path::FieldPath;
use crate::predicate::Predicate;
use crate::value::Value;
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Display unit of a decimal field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Bare number
    #[default]
    Plain,
    /// Amount in euros
    Euro,
    /// Surface in square metres
    SquareMetre,
}

/// Constraints on text fields
#[derive(Debug, Clone, Default)]
pub struct TextRule {
    /// Maximum number of characters
    pub max_len: Option<usize>,
    /// Pattern the whole value must match
    pub pattern: Option<Regex>,
}

/// Constraints on decimal fields
#[derive(Debug, Clone, Default)]
pub struct DecimalRule {
    /// Inclusive lower bound
    pub min: Option<Decimal>,
    /// Inclusive upper bound
    pub max: Option<Decimal>,
    /// Maximum number of fractional digits
    pub scale: Option<u32>,
    /// Display unit
    pub unit: Unit,
}

/// Repeatable group declaration
#[derive(Debug, Clone, Default)]
pub struct ListRule {
    /// Minimum number of items for the group to count as answered
    pub min_items: usize,
    /// Maximum number of items
    pub max_items: Option<usize>,
    /// Item field names, in declaration order
    pub fields: Vec<String>,
}

/// Item cap for groups that declare no `max_items`
pub const DEFAULT_MAX_ITEMS: usize = 100;

impl ListRule {
    /// Effective maximum number of items
    #[inline]
    #[must_use]
    pub fn item_limit(&self) -> usize {
        self.max_items.unwrap_or(DEFAULT_MAX_ITEMS)
    }
}

/// Semantic type of a field with its constraints
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Free text
    Text(TextRule),
    /// Yes/no
    Boolean,
    /// Exact decimal
    Decimal(DecimalRule),
    /// ISO calendar date
    Date,
    /// One of a closed set of choices
    Enum(Vec<String>),
    /// Repeatable group of item fields
    List(ListRule),
}

impl FieldKind {
    /// Short type name
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Boolean => "boolean",
            Self::Decimal(_) => "decimal",
            Self::Date => "date",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
        }
    }

    /// Whether the kind is a repeatable group
    #[inline]
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Coerce an agent-supplied argument into a typed value
    ///
    /// # Errors
    /// Returns the first constraint the input violates
    pub fn coerce(&self, raw: &serde_json::Value) -> Result<Value, ConstraintViolation> {
        if raw.is_null() {
            return Err(ConstraintViolation::Null);
        }
        let value = match self {
            Self::Text(_) => Value::Text(coerce_text(raw)?),
            Self::Boolean => Value::Boolean(coerce_bool(raw)?),
            Self::Decimal(_) => Value::Decimal(coerce_decimal(raw)?),
            Self::Date => Value::Date(coerce_date(raw)?),
            Self::Enum(choices) => Value::Choice(coerce_choice(raw, choices)?),
            Self::List(_) => return Err(ConstraintViolation::GroupNotAssignable),
        };
        self.check(&value)?;
        Ok(value)
    }

    /// Check an already-typed value against the declared constraints
    ///
    /// # Errors
    /// Returns the first constraint the value violates
    pub fn check(&self, value: &Value) -> Result<(), ConstraintViolation> {
        match (self, value) {
            (Self::Text(rule), Value::Text(s)) => {
                if s.trim().is_empty() {
                    return Err(ConstraintViolation::Empty);
                }
                if let Some(max) = rule.max_len {
                    let actual = s.chars().count();
                    if actual > max {
                        return Err(ConstraintViolation::TooLong { max, actual });
                    }
                }
                if let Some(pattern) = &rule.pattern {
                    if !pattern.is_match(s) {
                        return Err(ConstraintViolation::PatternMismatch {
                            pattern: pattern.as_str().to_string(),
                        });
                    }
                }
                Ok(())
            }
            (Self::Boolean, Value::Boolean(_)) | (Self::Date, Value::Date(_)) => Ok(()),
            (Self::Decimal(rule), Value::Decimal(d)) => {
                if let Some(min) = rule.min {
                    if *d < min {
                        return Err(ConstraintViolation::BelowMinimum { min, actual: *d });
                    }
                }
                if let Some(max) = rule.max {
                    if *d > max {
                        return Err(ConstraintViolation::AboveMaximum { max, actual: *d });
                    }
                }
                if let Some(scale) = rule.scale {
                    let actual = d.normalize().scale();
                    if actual > scale {
                        return Err(ConstraintViolation::TooManyDecimals { scale, actual });
                    }
                }
                Ok(())
            }
            (Self::Enum(choices), Value::Choice(c)) => {
                if choices.iter().any(|x| x == c) {
                    Ok(())
                } else {
                    Err(ConstraintViolation::NotInChoices {
                        input: c.clone(),
                        choices: choices.clone(),
                    })
                }
            }
            (Self::List(_), _) => Err(ConstraintViolation::GroupNotAssignable),
            (kind, value) => Err(ConstraintViolation::WrongType {
                expected: kind.type_name(),
                found: value.type_name().to_string(),
            }),
        }
    }
}

fn json_type_name(raw: &serde_json::Value) -> String {
    match raw {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
    .to_string()
}

fn coerce_text(raw: &serde_json::Value) -> Result<String, ConstraintViolation> {
    match raw {
        serde_json::Value::String(s) => Ok(s.trim().to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(ConstraintViolation::WrongType {
            expected: "text",
            found: json_type_name(other),
        }),
    }
}

fn coerce_bool(raw: &serde_json::Value) -> Result<bool, ConstraintViolation> {
    match raw {
        serde_json::Value::Bool(b) => Ok(*b),
        serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "oui" | "yes" => Ok(true),
            "false" | "non" | "no" => Ok(false),
            _ => Err(ConstraintViolation::NotBoolean { input: s.clone() }),
        },
        other => Err(ConstraintViolation::WrongType {
            expected: "boolean",
            found: json_type_name(other),
        }),
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn coerce_decimal(raw: &serde_json::Value) -> Result<Decimal, ConstraintViolation> {
    match raw {
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            parse_decimal(&text).ok_or(ConstraintViolation::NotDecimal { input: text })
        }
        serde_json::Value::String(s) => {
            // "1 500,50 €" → "1500.50"
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '€')
                .map(|c| if c == ',' { '.' } else { c })
                .collect();
            parse_decimal(&cleaned)
                .ok_or_else(|| ConstraintViolation::NotDecimal { input: s.clone() })
        }
        other => Err(ConstraintViolation::WrongType {
            expected: "decimal",
            found: json_type_name(other),
        }),
    }
}

fn coerce_date(raw: &serde_json::Value) -> Result<NaiveDate, ConstraintViolation> {
    match raw {
        serde_json::Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| ConstraintViolation::NotIsoDate { input: s.clone() }),
        other => Err(ConstraintViolation::WrongType {
            expected: "date",
            found: json_type_name(other),
        }),
    }
}

fn coerce_choice(
    raw: &serde_json::Value,
    choices: &[String],
) -> Result<String, ConstraintViolation> {
    let serde_json::Value::String(s) = raw else {
        return Err(ConstraintViolation::WrongType {
            expected: "enum",
            found: json_type_name(raw),
        });
    };
    let wanted = s.trim();
    if let Some(exact) = choices.iter().find(|c| c.as_str() == wanted) {
        return Ok(exact.clone());
    }
    let lowered = wanted.to_lowercase();
    choices
        .iter()
        .find(|c| c.to_lowercase() == lowered)
        .cloned()
        .ok_or_else(|| ConstraintViolation::NotInChoices {
            input: s.clone(),
            choices: choices.to_vec(),
        })
}

/// A constraint rejected by coercion or checking
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintViolation {
    /// `null` supplied where a value is expected
    #[error("null is not a value (use clear to unset a field)")]
    Null,

    /// Argument of the wrong JSON/value type
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: String,
    },

    /// Blank text
    #[error("text must not be empty")]
    Empty,

    /// Text longer than allowed
    #[error("text too long: {actual} characters (max {max})")]
    TooLong { max: usize, actual: usize },

    /// Text does not match the declared pattern
    #[error("text does not match pattern {pattern}")]
    PatternMismatch { pattern: String },

    /// Not a boolean literal
    #[error("'{input}' is not a boolean literal (true/false, oui/non, yes/no)")]
    NotBoolean { input: String },

    /// Not a decimal number
    #[error("'{input}' is not a decimal number")]
    NotDecimal { input: String },

    /// Below inclusive minimum
    #[error("{actual} is below the minimum {min}")]
    BelowMinimum { min: Decimal, actual: Decimal },

    /// Above inclusive maximum
    #[error("{actual} is above the maximum {max}")]
    AboveMaximum { max: Decimal, actual: Decimal },

    /// Too many fractional digits
    #[error("{actual} decimal places exceed the allowed {scale}")]
    TooManyDecimals { scale: u32, actual: u32 },

    /// Not an ISO date
    #[error("'{input}' is not an ISO date (YYYY-MM-DD)")]
    NotIsoDate { input: String },

    /// Not one of the declared choices
    #[error("'{input}' is not one of {choices:?}")]
    NotInChoices { input: String, choices: Vec<String> },

    /// A repeatable group cannot receive a value directly
    #[error("list groups take items, not values")]
    GroupNotAssignable,

    /// The group already holds its maximum number of items
    #[error("group is full ({max} items)")]
    GroupFull { max: usize },
}

/// Declaration of one document field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) key: String,
    pub(crate) path: FieldPath,
    pub(crate) label: String,
    pub(crate) kind: FieldKind,
    pub(crate) required: bool,
    pub(crate) visible_when: Option<Predicate>,
    pub(crate) group: Option<String>,
}

impl FieldSpec {
    /// Schema key (`section.field` or `section.group[].field`)
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Full path for top-level fields, item-relative path for item fields
    #[inline]
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Human label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Semantic type
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Whether the field must be answered when visible
    #[inline]
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Visibility predicate, if any
    #[inline]
    #[must_use]
    pub fn visible_when(&self) -> Option<&Predicate> {
        self.visible_when.as_ref()
    }

    /// Schema key of the enclosing group for item fields
    #[inline]
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Whether this declares a repeatable group
    #[inline]
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.kind.is_list()
    }

    /// Group rule for list declarations
    #[inline]
    #[must_use]
    pub fn list_rule(&self) -> Option<&ListRule> {
        match &self.kind {
            FieldKind::List(rule) => Some(rule),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn money() -> FieldKind {
        FieldKind::Decimal(DecimalRule {
            min: Some(Decimal::ZERO),
            max: Some(Decimal::from(100_000)),
            scale: Some(2),
            unit: Unit::Euro,
        })
    }

    #[test]
    fn boolean_literals() {
        let kind = FieldKind::Boolean;
        assert_eq!(kind.coerce(&json!(true)).unwrap(), Value::Boolean(true));
        assert_eq!(kind.coerce(&json!("OUI")).unwrap(), Value::Boolean(true));
        assert_eq!(kind.coerce(&json!("no")).unwrap(), Value::Boolean(false));
        assert!(matches!(
            kind.coerce(&json!("maybe")),
            Err(ConstraintViolation::NotBoolean { .. })
        ));
        assert!(matches!(
            kind.coerce(&json!(1)),
            Err(ConstraintViolation::WrongType { .. })
        ));
    }

    #[test]
    fn decimal_accepts_french_formatting() {
        let v = money().coerce(&json!("1 500,50 €")).unwrap();
        assert_eq!(v, Value::Decimal(Decimal::from_str("1500.50").unwrap()));
        let v = money().coerce(&json!(1500)).unwrap();
        assert_eq!(v, Value::Decimal(Decimal::from(1500)));
    }

    #[test]
    fn decimal_enforces_bounds_and_scale() {
        assert!(matches!(
            money().coerce(&json!(-1)),
            Err(ConstraintViolation::BelowMinimum { .. })
        ));
        assert!(matches!(
            money().coerce(&json!(200_000)),
            Err(ConstraintViolation::AboveMaximum { .. })
        ));
        assert!(matches!(
            money().coerce(&json!("10.123")),
            Err(ConstraintViolation::TooManyDecimals { scale: 2, actual: 3 })
        ));
        // trailing zeros do not count
        assert!(money().coerce(&json!("10.500")).is_ok());
        assert!(matches!(
            money().coerce(&json!("abc")),
            Err(ConstraintViolation::NotDecimal { .. })
        ));
    }

    #[test]
    fn date_requires_iso() {
        let v = FieldKind::Date.coerce(&json!("2025-09-01")).unwrap();
        assert_eq!(v, Value::Date(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()));
        assert!(matches!(
            FieldKind::Date.coerce(&json!("01/09/2025")),
            Err(ConstraintViolation::NotIsoDate { .. })
        ));
    }

    #[test]
    fn enum_normalises_case() {
        let kind = FieldKind::Enum(vec!["Individuel".into(), "Collectif".into()]);
        assert_eq!(
            kind.coerce(&json!("collectif")).unwrap(),
            Value::Choice("Collectif".into())
        );
        assert!(matches!(
            kind.coerce(&json!("Mixte")),
            Err(ConstraintViolation::NotInChoices { .. })
        ));
    }

    #[test]
    fn text_rules() {
        let kind = FieldKind::Text(TextRule {
            max_len: Some(5),
            pattern: Some(Regex::new(r"^[a-z]+$").unwrap()),
        });
        assert_eq!(kind.coerce(&json!(" abc ")).unwrap(), Value::Text("abc".into()));
        assert_eq!(kind.coerce(&json!("")), Err(ConstraintViolation::Empty));
        assert!(matches!(
            kind.coerce(&json!("abcdef")),
            Err(ConstraintViolation::TooLong { max: 5, actual: 6 })
        ));
        assert!(matches!(
            kind.coerce(&json!("ab1")),
            Err(ConstraintViolation::PatternMismatch { .. })
        ));
    }

    #[test]
    fn null_and_lists_rejected() {
        assert_eq!(FieldKind::Date.coerce(&json!(null)), Err(ConstraintViolation::Null));
        let list = FieldKind::List(ListRule::default());
        assert_eq!(
            list.coerce(&json!("x")),
            Err(ConstraintViolation::GroupNotAssignable)
        );
    }

    #[test]
    fn check_rejects_mismatched_value_type() {
        let err = FieldKind::Boolean
            .check(&Value::Text("true".into()))
            .unwrap_err();
        assert_eq!(
            err,
            ConstraintViolation::WrongType {
                expected: "boolean",
                found: "text".into()
            }
        );
    }
}
