//! Contract outline
//!
//! The clause tree the renderer walks. Declared in YAML, compiled against
//! a [`Schema`] so that every placeholder, group and condition is known to
//! resolve before any session is rendered.

use crate::error::RenderStructuralError;
use bail_schema::{ContentDigest, FieldPath, Predicate, PredicateDecl, Schema};
use serde::Deserialize;

/// Embedded outline of the furnished-lease contract
pub const FURNISHED_LEASE_OUTLINE: &str = include_str!("../templates/bail_meuble.yaml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OutlineDecl {
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    body: Vec<NodeDecl>,
    #[serde(default)]
    footer: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDecl {
    #[serde(default)]
    heading: Option<String>,
    #[serde(default)]
    subheading: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    bullets: Option<Vec<String>>,
    #[serde(default)]
    field: Option<FieldDecl>,
    #[serde(default)]
    when: Option<WhenDecl>,
    #[serde(default)]
    repeat: Option<RepeatDecl>,
    #[serde(default)]
    signatures: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldDecl {
    Path(String),
    Labelled { path: String, label: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WhenDecl {
    condition: PredicateDecl,
    body: Vec<NodeDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RepeatDecl {
    group: String,
    #[serde(default)]
    empty: Option<String>,
    item: Vec<NodeDecl>,
}

/// Compiled outline node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Clause heading
    Heading(String),
    /// Sub-clause heading
    Subheading(String),
    /// Fixed paragraph
    Text(String),
    /// Fixed bullet list
    Bullets(Vec<String>),
    /// Value placeholder; item-relative inside a repeat
    Field {
        path: FieldPath,
        label: Option<String>,
    },
    /// Conditional clause
    When {
        condition: Predicate,
        body: Vec<Node>,
    },
    /// One rendition of `item` per group item, or `empty` when there is none
    Repeat {
        group: FieldPath,
        empty: Option<String>,
        item: Vec<Node>,
    },
    /// Signature boxes, one per label
    Signatures(Vec<String>),
}

/// Compiled contract outline
#[derive(Debug, Clone)]
pub struct Outline {
    title: String,
    subtitle: Option<String>,
    footer: Option<String>,
    body: Vec<Node>,
    schema: ContentDigest,
}

impl Outline {
    /// Compile the embedded furnished-lease outline
    ///
    /// # Errors
    /// Returns error if the outline drifted from the schema
    pub fn furnished_lease(schema: &Schema) -> Result<Self, RenderStructuralError> {
        Self::from_yaml_str(FURNISHED_LEASE_OUTLINE, schema)
    }

    /// Parse and compile an outline against `schema`
    ///
    /// # Errors
    /// Returns the first structural problem found
    pub fn from_yaml_str(source: &str, schema: &Schema) -> Result<Self, RenderStructuralError> {
        let decl: OutlineDecl = serde_yaml::from_str(source)?;
        let compiler = Compiler { schema };
        Ok(Self {
            title: decl.title,
            subtitle: decl.subtitle,
            footer: decl.footer,
            body: compiler.nodes(&decl.body, "body", None)?,
            schema: schema.fingerprint(),
        })
    }

    /// Document title
    #[inline]
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Line under the title
    #[inline]
    #[must_use]
    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    /// Closing line
    #[inline]
    #[must_use]
    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }

    /// Top-level nodes
    #[inline]
    #[must_use]
    pub fn body(&self) -> &[Node] {
        &self.body
    }

    /// Fingerprint of the schema the outline was compiled against
    #[inline]
    #[must_use]
    pub fn schema_fingerprint(&self) -> ContentDigest {
        self.schema
    }

    /// Ensure the outline was compiled against `schema`
    ///
    /// # Errors
    /// Returns [`RenderStructuralError::SchemaMismatch`] otherwise
    pub fn check(&self, schema: &Schema) -> Result<(), RenderStructuralError> {
        if self.schema == schema.fingerprint() {
            Ok(())
        } else {
            Err(RenderStructuralError::SchemaMismatch {
                expected: self.schema.short(),
                actual: schema.fingerprint().short(),
            })
        }
    }
}

struct Compiler<'a> {
    schema: &'a Schema,
}

impl Compiler<'_> {
    fn nodes(
        &self,
        decls: &[NodeDecl],
        at: &str,
        group: Option<&FieldPath>,
    ) -> Result<Vec<Node>, RenderStructuralError> {
        decls
            .iter()
            .enumerate()
            .map(|(i, decl)| self.node(decl, &format!("{at}[{i}]"), group))
            .collect()
    }

    fn node(
        &self,
        decl: &NodeDecl,
        at: &str,
        group: Option<&FieldPath>,
    ) -> Result<Node, RenderStructuralError> {
        let present = [
            decl.heading.is_some(),
            decl.subheading.is_some(),
            decl.text.is_some(),
            decl.bullets.is_some(),
            decl.field.is_some(),
            decl.when.is_some(),
            decl.repeat.is_some(),
            decl.signatures.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();
        if present != 1 {
            return Err(malformed(at, "node needs exactly one kind"));
        }

        if let Some(text) = &decl.heading {
            return Ok(Node::Heading(text.clone()));
        }
        if let Some(text) = &decl.subheading {
            return Ok(Node::Subheading(text.clone()));
        }
        if let Some(text) = &decl.text {
            return Ok(Node::Text(text.clone()));
        }
        if let Some(items) = &decl.bullets {
            return Ok(Node::Bullets(items.clone()));
        }
        if let Some(labels) = &decl.signatures {
            return Ok(Node::Signatures(labels.clone()));
        }
        if let Some(field) = &decl.field {
            return self.field(field, at, group);
        }
        if let Some(when) = &decl.when {
            let condition = self
                .schema
                .compile_predicate(at, &when.condition)
                .map_err(|source| RenderStructuralError::Condition {
                    at: at.to_string(),
                    source,
                })?;
            return Ok(Node::When {
                condition,
                body: self.nodes(&when.body, &format!("{at}.when.body"), group)?,
            });
        }
        match &decl.repeat {
            Some(repeat) => self.repeat(repeat, at, group),
            None => Err(malformed(at, "node needs exactly one kind")),
        }
    }

    fn field(
        &self,
        decl: &FieldDecl,
        at: &str,
        group: Option<&FieldPath>,
    ) -> Result<Node, RenderStructuralError> {
        let (raw, label) = match decl {
            FieldDecl::Path(raw) => (raw, None),
            FieldDecl::Labelled { path, label } => (path, Some(label.clone())),
        };
        let path = parse(raw, at)?;
        let key = match group {
            Some(group) => format!("{}[].{path}", group.schema_key()),
            None => path.schema_key(),
        };
        let spec = self
            .schema
            .get(&key)
            .ok_or_else(|| RenderStructuralError::UndeclaredPath(key.clone()))?;
        if spec.is_list() {
            return Err(RenderStructuralError::NotALeaf(key));
        }
        Ok(Node::Field { path, label })
    }

    fn repeat(
        &self,
        decl: &RepeatDecl,
        at: &str,
        group: Option<&FieldPath>,
    ) -> Result<Node, RenderStructuralError> {
        if group.is_some() {
            return Err(malformed(at, "repeat inside repeat"));
        }
        let path = parse(&decl.group, at)?;
        let spec = self
            .schema
            .get(&path.schema_key())
            .ok_or_else(|| RenderStructuralError::UndeclaredPath(path.to_string()))?;
        if !spec.is_list() {
            return Err(RenderStructuralError::NotAGroup(path.to_string()));
        }
        let item = self.nodes(&decl.item, &format!("{at}.repeat.item"), Some(&path))?;
        Ok(Node::Repeat {
            group: path,
            empty: decl.empty.clone(),
            item,
        })
    }
}

fn parse(raw: &str, at: &str) -> Result<FieldPath, RenderStructuralError> {
    let path: FieldPath = raw
        .parse()
        .map_err(|e| malformed(at, &format!("bad path '{raw}': {e}")))?;
    if path.has_index() {
        return Err(malformed(at, "outline paths carry no item index"));
    }
    Ok(path)
}

fn malformed(at: &str, reason: &str) -> RenderStructuralError {
    RenderStructuralError::MalformedNode {
        at: at.to_string(),
        reason: reason.to_string(),
    }
}
