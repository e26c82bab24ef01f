//! Canonical field paths
//!
//! Provides [`FieldPath`] for addressing fields of the lease document,
//! including items of repeatable groups (`group[index].field`).

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One step of a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Named field or group
    Field(String),
    /// Zero-based item position inside the preceding group
    Index(usize),
}

/// Path to a field of the document
///
/// Hierarchical structure of named segments with at most one item index.
///
/// # Examples
/// - `designation_parties.bailleur.email`
/// - `designation_parties.locataires[0].nom_prenom`
///
/// The dotted index form `designation_parties.locataires.0.nom_prenom` is
/// accepted on input and displayed with brackets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath(Vec<Segment>);

impl FieldPath {
    /// Create path from named segments
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(|n| Segment::Field(n.into())).collect())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path has no segments
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Top-level section name (first segment)
    #[inline]
    #[must_use]
    pub fn section(&self) -> Option<&str> {
        match self.0.first() {
            Some(Segment::Field(name)) => Some(name),
            _ => None,
        }
    }

    /// Append a named segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut new = self.clone();
        new.0.push(Segment::Field(name.into()));
        new
    }

    /// Address item `index` of the group at this path
    #[inline]
    #[must_use]
    pub fn item(&self, index: usize) -> Self {
        let mut new = self.clone();
        new.0.push(Segment::Index(index));
        new
    }

    /// Whether the path addresses a field inside a list item
    #[inline]
    #[must_use]
    pub fn has_index(&self) -> bool {
        self.0.iter().any(|s| matches!(s, Segment::Index(_)))
    }

    /// Split an item path into `(group, index, field)`
    ///
    /// Returns `None` for paths without an index. `field` is empty when the
    /// path addresses the item itself (`group[2]`).
    #[must_use]
    pub fn split_item(&self) -> Option<(FieldPath, usize, FieldPath)> {
        let pos = self
            .0
            .iter()
            .position(|s| matches!(s, Segment::Index(_)))?;
        let Segment::Index(index) = self.0[pos] else {
            return None;
        };
        Some((
            Self(self.0[..pos].to_vec()),
            index,
            Self(self.0[pos + 1..].to_vec()),
        ))
    }

    /// Join another path under this one
    #[must_use]
    pub fn join(&self, rest: &FieldPath) -> Self {
        let mut new = self.clone();
        new.0.extend(rest.0.iter().cloned());
        new
    }

    /// Key used by the schema registry
    ///
    /// Indices are erased: `locataires[3].nom` → `locataires[].nom`.
    #[must_use]
    pub fn schema_key(&self) -> String {
        self.render(|_| "[]".to_string())
    }

    fn render(&self, index: impl Fn(usize) -> String) -> String {
        let mut out = String::new();
        for seg in &self.0 {
            match seg {
                Segment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                Segment::Index(i) => out.push_str(&index(*i)),
            }
        }
        out
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(|i| format!("[{i}]")))
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for piece in s.split('.') {
            if piece.is_empty() {
                return Err(PathError::EmptySegment);
            }

            // Dotted index form: `group.0.field`
            if piece.chars().all(|c| c.is_ascii_digit()) {
                let index = piece
                    .parse()
                    .map_err(|_| PathError::InvalidIndex(piece.to_string()))?;
                segments.push(Segment::Index(index));
                continue;
            }

            let (name, index) = match piece.find('[') {
                Some(open) => {
                    let Some(inner) = piece[open + 1..].strip_suffix(']') else {
                        return Err(PathError::InvalidIndex(piece.to_string()));
                    };
                    let index = inner
                        .parse::<usize>()
                        .map_err(|_| PathError::InvalidIndex(piece.to_string()))?;
                    (&piece[..open], Some(index))
                }
                None => (piece, None),
            };

            if !valid_name(name) {
                return Err(PathError::InvalidSegment(name.to_string()));
            }
            segments.push(Segment::Field(name.to_string()));
            if let Some(index) = index {
                segments.push(Segment::Index(index));
            }
        }

        if !matches!(segments.first(), Some(Segment::Field(_))) {
            return Err(PathError::LeadingIndex);
        }
        if segments
            .iter()
            .filter(|s| matches!(s, Segment::Index(_)))
            .count()
            > 1
        {
            return Err(PathError::NestedIndex(s.to_string()));
        }

        Ok(Self(segments))
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

/// Errors related to field paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty path
    #[error("path is empty")]
    Empty,

    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid segment: {0} (must be alphanumeric or underscore)")]
    InvalidSegment(String),

    /// Malformed item index
    #[error("invalid item index in '{0}'")]
    InvalidIndex(String),

    /// Path starts with an index
    #[error("path must start with a field name")]
    LeadingIndex,

    /// More than one item index
    #[error("nested list items are not supported: {0}")]
    NestedIndex(String),
}
