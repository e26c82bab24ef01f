//! Typed field values

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Typed value held by a document field
///
/// Values are always produced by coercion against a [`FieldKind`]
/// so a stored value is consistent with its declaration.
///
/// [`FieldKind`]: crate::FieldKind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Free text
    Text(String),
    /// Yes/no answer
    Boolean(bool),
    /// Exact decimal number (amounts, surfaces, counts)
    Decimal(Decimal),
    /// Calendar date
    Date(NaiveDate),
    /// Declared enum variant, in its canonical spelling
    Choice(String),
}

impl Value {
    /// Truthiness used by visibility predicates
    ///
    /// `true`, non-empty text, non-zero decimals, any date, any choice.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Text(s) => !s.trim().is_empty(),
            Self::Boolean(b) => *b,
            Self::Decimal(d) => !d.is_zero(),
            Self::Date(_) | Self::Choice(_) => true,
        }
    }

    /// Name of the variant, for diagnostics
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Boolean(_) => "boolean",
            Self::Decimal(_) => "decimal",
            Self::Date(_) => "date",
            Self::Choice(_) => "enum",
        }
    }

    /// Borrow as boolean
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as decimal
    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Borrow textual content (text or choice)
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Choice(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Choice(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}
