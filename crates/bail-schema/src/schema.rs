//! Schema registry
//!
//! [`Schema`] is the read-only registry of every declared field. It is
//! built once from a YAML declaration, validated as a whole, and then
//! shared (`Arc`) by every session.

use crate::decl::{FieldDecl, KindDecl, PredicateDecl, SchemaDecl};
use crate::digest::ContentDigest;
use crate::error::SchemaError;
use crate::field::{DecimalRule, FieldKind, FieldSpec, ListRule, TextRule, DEFAULT_MAX_ITEMS};
use crate::path::FieldPath;
use crate::predicate::{Predicate, ValueSource};
use crate::value::Value;
use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

/// Embedded declaration of the French furnished-lease catalog
pub const FURNISHED_LEASE_SOURCE: &str = include_str!("../schemas/bail_meuble.yaml");

/// Top-level section of the document
#[derive(Debug, Clone)]
pub struct SectionSpec {
    key: String,
    label: String,
    fields: Vec<String>,
}

impl SectionSpec {
    /// Section key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Human label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Schema keys of the section's top-level fields and groups
    #[inline]
    #[must_use]
    pub fn field_keys(&self) -> &[String] {
        &self.fields
    }
}

/// Declarative, read-only field registry
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    sections: Vec<SectionSpec>,
    fields: IndexMap<String, FieldSpec>,
    fingerprint: ContentDigest,
}

impl Schema {
    /// Load the French furnished-lease catalog
    ///
    /// # Errors
    /// Returns error if the embedded declaration fails validation
    pub fn furnished_lease() -> Result<Self, SchemaError> {
        Self::from_yaml_str(FURNISHED_LEASE_SOURCE)
    }

    /// Load and validate a YAML declaration
    ///
    /// # Errors
    /// Returns the first structural problem found: syntax, duplicates,
    /// dangling or list references, bad literals, cycles, bad constraints
    pub fn from_yaml_str(source: &str) -> Result<Self, SchemaError> {
        let decl: SchemaDecl = serde_yaml::from_str(source)?;
        Self::from_decl(decl, ContentDigest::compute(source.as_bytes()))
    }

    fn from_decl(decl: SchemaDecl, fingerprint: ContentDigest) -> Result<Self, SchemaError> {
        let mut schema = Self {
            name: decl.name,
            sections: Vec::with_capacity(decl.sections.len()),
            fields: IndexMap::new(),
            fingerprint,
        };
        let mut pending: Vec<(String, PredicateDecl)> = Vec::new();

        for section in decl.sections {
            let section_path = parse_decl_path(&section.key)?;
            if section_path.len() != 1 {
                return Err(SchemaError::InvalidDeclaration {
                    field: section.key,
                    reason: "section key must be a single segment".into(),
                });
            }

            let mut keys = Vec::with_capacity(section.fields.len());
            for field in section.fields {
                let path = section_path.join(&parse_decl_path(&field.key)?);
                let key = path.to_string();
                keys.push(key.clone());
                schema.register(key, path, None, field, &mut pending)?;
            }

            if schema.sections.iter().any(|s| s.key == section.key) {
                return Err(SchemaError::Duplicate(section.key));
            }
            schema.sections.push(SectionSpec {
                key: section.key,
                label: section.label,
                fields: keys,
            });
        }

        let mut compiled = Vec::with_capacity(pending.len());
        for (owner, decl) in &pending {
            compiled.push((owner.clone(), schema.compile_predicate(owner, decl)?));
        }
        for (owner, predicate) in compiled {
            if let Some(spec) = schema.fields.get_mut(&owner) {
                spec.visible_when = Some(predicate);
            }
        }

        schema.check_cycles()?;
        Ok(schema)
    }

    fn register(
        &mut self,
        key: String,
        path: FieldPath,
        group: Option<String>,
        decl: FieldDecl,
        pending: &mut Vec<(String, PredicateDecl)>,
    ) -> Result<(), SchemaError> {
        if self.fields.contains_key(&key) {
            return Err(SchemaError::Duplicate(key));
        }
        if let Some(predicate) = decl.visible_when.clone() {
            pending.push((key.clone(), predicate));
        }

        let mut required = decl.required;
        let kind = match decl.kind {
            KindDecl::Text => {
                let pattern = decl
                    .pattern
                    .as_deref()
                    .map(Regex::new)
                    .transpose()
                    .map_err(|e| SchemaError::InvalidDeclaration {
                        field: key.clone(),
                        reason: format!("invalid pattern: {e}"),
                    })?;
                FieldKind::Text(TextRule {
                    max_len: decl.max_len,
                    pattern,
                })
            }
            KindDecl::Boolean => FieldKind::Boolean,
            KindDecl::Date => FieldKind::Date,
            KindDecl::Decimal => {
                if let (Some(min), Some(max)) = (decl.min, decl.max) {
                    if min > max {
                        return Err(SchemaError::InvalidDeclaration {
                            field: key,
                            reason: format!("min {min} exceeds max {max}"),
                        });
                    }
                }
                FieldKind::Decimal(DecimalRule {
                    min: decl.min,
                    max: decl.max,
                    scale: decl.scale,
                    unit: decl.unit,
                })
            }
            KindDecl::Enum => {
                if decl.choices.is_empty() {
                    return Err(SchemaError::InvalidDeclaration {
                        field: key,
                        reason: "enum without choices".into(),
                    });
                }
                FieldKind::Enum(decl.choices.clone())
            }
            KindDecl::List => {
                if group.is_some() {
                    return Err(SchemaError::NestedList(key));
                }
                let min_items = if required {
                    decl.min_items.max(1)
                } else {
                    decl.min_items
                };
                if decl.max_items.unwrap_or(DEFAULT_MAX_ITEMS) < min_items {
                    return Err(SchemaError::InvalidDeclaration {
                        field: key,
                        reason: "max_items below min_items".into(),
                    });
                }
                required = min_items > 0;
                FieldKind::List(ListRule {
                    min_items,
                    max_items: decl.max_items,
                    fields: Vec::with_capacity(decl.fields.len()),
                })
            }
        };

        let items = if kind.is_list() { decl.fields } else { Vec::new() };
        self.fields.insert(
            key.clone(),
            FieldSpec {
                key: key.clone(),
                path,
                label: decl.label,
                kind,
                required,
                visible_when: None,
                group,
            },
        );

        for item in items {
            let rel = parse_decl_path(&item.key)?;
            let item_key = format!("{key}[].{rel}");
            let name = rel.to_string();
            self.register(item_key, rel, Some(key.clone()), item, pending)?;
            if let Some(FieldKind::List(rule)) = self.fields.get_mut(&key).map(|s| &mut s.kind) {
                rule.fields.push(name);
            }
        }
        Ok(())
    }

    /// Compile a predicate declaration against this schema
    ///
    /// `owner` names the declaration the predicate belongs to, for errors.
    ///
    /// # Errors
    /// Returns error on malformed nodes, undeclared or list references and
    /// literals that do not coerce to the referenced field's type
    pub fn compile_predicate(
        &self,
        owner: &str,
        decl: &PredicateDecl,
    ) -> Result<Predicate, SchemaError> {
        match (&decl.truthy, &decl.equals, &decl.all, &decl.any, &decl.not) {
            (Some(raw), None, None, None, None) => {
                let (path, _) = self.reference(owner, raw)?;
                Ok(Predicate::Truthy(path))
            }
            (None, Some(eq), None, None, None) => {
                let (path, spec) = self.reference(owner, &eq.path)?;
                let literal = spec.kind.coerce(&eq.value).map_err(|violation| {
                    SchemaError::InvalidLiteral {
                        field: owner.to_string(),
                        reference: eq.path.clone(),
                        violation,
                    }
                })?;
                Ok(Predicate::Equals(path, literal))
            }
            (None, None, Some(children), None, None) => {
                Ok(Predicate::All(self.compile_all(owner, children)?))
            }
            (None, None, None, Some(children), None) => {
                Ok(Predicate::Any(self.compile_all(owner, children)?))
            }
            (None, None, None, None, Some(child)) => {
                Ok(Predicate::Not(Box::new(self.compile_predicate(owner, child)?)))
            }
            _ => Err(SchemaError::InvalidDeclaration {
                field: owner.to_string(),
                reason: "predicate needs exactly one of truthy, equals, all, any, not".into(),
            }),
        }
    }

    fn compile_all(
        &self,
        owner: &str,
        children: &[PredicateDecl],
    ) -> Result<Vec<Predicate>, SchemaError> {
        children
            .iter()
            .map(|c| self.compile_predicate(owner, c))
            .collect()
    }

    fn reference(&self, owner: &str, raw: &str) -> Result<(FieldPath, &FieldSpec), SchemaError> {
        let path = parse_decl_path(raw)?;
        if path.has_index() {
            return Err(SchemaError::ListReference {
                field: owner.to_string(),
                reference: raw.to_string(),
            });
        }
        let spec = self
            .fields
            .get(&path.schema_key())
            .ok_or_else(|| SchemaError::DanglingReference {
                field: owner.to_string(),
                reference: raw.to_string(),
            })?;
        if spec.is_list() || spec.group.is_some() {
            return Err(SchemaError::ListReference {
                field: owner.to_string(),
                reference: raw.to_string(),
            });
        }
        Ok((path, spec))
    }

    fn check_cycles(&self) -> Result<(), SchemaError> {
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for (index, spec) in self.fields.values().enumerate() {
            graph.add_node(index);
            let Some(predicate) = &spec.visible_when else {
                continue;
            };
            for reference in predicate.references() {
                if let Some(dep) = self.fields.get_index_of(&reference.schema_key()) {
                    graph.add_edge(dep, index, ());
                }
            }
        }

        toposort(&graph, None).map(|_| ()).map_err(|cycle| {
            let key = self
                .fields
                .get_index(cycle.node_id())
                .map_or_else(String::new, |(k, _)| k.clone());
            SchemaError::PredicateCycle(key)
        })
    }

    /// Catalog name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blake3 digest of the declaration source
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> ContentDigest {
        self.fingerprint
    }

    /// Sections in document order
    #[inline]
    #[must_use]
    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }

    /// Look up a section by key
    #[must_use]
    pub fn section(&self, key: &str) -> Option<&SectionSpec> {
        self.sections.iter().find(|s| s.key == key)
    }

    /// Top-level fields and groups of a section, in declaration order
    pub fn section_fields<'a>(
        &'a self,
        section: &'a SectionSpec,
    ) -> impl Iterator<Item = &'a FieldSpec> + 'a {
        section.fields.iter().filter_map(|k| self.fields.get(k))
    }

    /// Every declaration (item fields included), in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    /// Number of declarations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether nothing is declared
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a declaration by schema key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.get(key)
    }

    /// Resolve a concrete path to its declaration
    ///
    /// # Errors
    /// Returns [`SchemaError::Undeclared`] if the path is not declared
    pub fn resolve(&self, path: &FieldPath) -> Result<&FieldSpec, SchemaError> {
        self.fields
            .get(&path.schema_key())
            .ok_or_else(|| SchemaError::Undeclared(path.to_string()))
    }

    /// Declaration of the repeatable group at `group`
    ///
    /// # Errors
    /// Returns error if the path is undeclared or not a list group
    pub fn item_schema(&self, group: &FieldPath) -> Result<&FieldSpec, SchemaError> {
        if group.has_index() {
            return Err(SchemaError::NotAGroup(group.to_string()));
        }
        let spec = self.resolve(group)?;
        if spec.is_list() {
            Ok(spec)
        } else {
            Err(SchemaError::NotAGroup(group.to_string()))
        }
    }

    /// Item field declarations of a group, in declaration order
    pub fn item_fields<'a>(
        &'a self,
        group: &'a FieldSpec,
    ) -> impl Iterator<Item = &'a FieldSpec> + 'a {
        group
            .list_rule()
            .map(|rule| rule.fields.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |name| self.fields.get(&format!("{}[].{name}", group.key)))
    }

    /// Whether the field at `path` is currently visible
    ///
    /// Undeclared paths are never visible.
    #[must_use]
    pub fn is_visible(&self, path: &FieldPath, source: &dyn ValueSource) -> bool {
        self.fields
            .get(&path.schema_key())
            .is_some_and(|spec| self.spec_visible(spec, source))
    }

    /// Whether a declaration is currently visible
    ///
    /// Item fields additionally require their group to be visible.
    #[must_use]
    pub fn spec_visible(&self, spec: &FieldSpec, source: &dyn ValueSource) -> bool {
        if let Some(group) = spec.group.as_deref().and_then(|g| self.fields.get(g)) {
            if !self.spec_visible(group, source) {
                return false;
            }
        }
        match &spec.visible_when {
            None => true,
            Some(predicate) => {
                predicate.evaluate(&|path: &FieldPath| self.effective_value(path, source))
            }
        }
    }

    /// Value of a field if it is visible, `None` otherwise
    #[must_use]
    pub fn effective_value<'s>(
        &self,
        path: &FieldPath,
        source: &'s dyn ValueSource,
    ) -> Option<&'s Value> {
        if self.is_visible(path, source) {
            source.value_at(path)
        } else {
            None
        }
    }
}

fn parse_decl_path(raw: &str) -> Result<FieldPath, SchemaError> {
    let path: FieldPath = raw.parse().map_err(|source| SchemaError::InvalidPath {
        path: raw.to_string(),
        source,
    })?;
    if path.has_index() {
        return Err(SchemaError::InvalidPath {
            path: raw.to_string(),
            source: crate::path::PathError::InvalidIndex(raw.to_string()),
        });
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    const SMALL: &str = r#"
name: small
sections:
  - key: a
    label: A
    fields:
      - key: mode
        label: Mode
        type: enum
        choices: [Individuel, Collectif]
      - key: detail
        label: Detail
        type: text
        required: true
        visible_when:
          equals: { path: a.mode, value: collectif }
      - key: sub_detail
        label: Sub detail
        type: text
        required: true
        visible_when:
          truthy: a.detail
      - key: people
        label: People
        type: list
        required: true
        visible_when:
          not: { equals: { path: a.mode, value: Individuel } }
        fields:
          - key: name
            label: Name
            type: text
            required: true
"#;

    #[test]
    fn furnished_lease_loads() {
        let schema = Schema::furnished_lease().unwrap();
        assert_eq!(schema.name(), "bail_meuble");
        assert!(!schema.is_empty());
        let rent = schema
            .resolve(&path("conditions_financieres.loyer.montant_hors_charges"))
            .unwrap();
        assert!(rent.is_required());
        let tenants = schema
            .item_schema(&path("designation_parties.locataires"))
            .unwrap();
        assert_eq!(tenants.list_rule().unwrap().min_items, 1);
        assert!(schema
            .resolve(&path("designation_parties.locataires[4].nom_prenom"))
            .is_ok());
    }

    #[test]
    fn equality_literal_is_normalised() {
        let schema = Schema::from_yaml_str(SMALL).unwrap();
        let detail = schema.get("a.detail").unwrap();
        assert_eq!(
            detail.visible_when(),
            Some(&Predicate::Equals(path("a.mode"), Value::Choice("Collectif".into())))
        );
    }

    #[test]
    fn visibility_uses_effective_values() {
        let schema = Schema::from_yaml_str(SMALL).unwrap();
        let mut values: HashMap<FieldPath, Value> = HashMap::new();
        values.insert(path("a.detail"), Value::Text("x".into()));

        // detail is filled ahead but hidden, so sub_detail stays hidden too
        assert!(!schema.is_visible(&path("a.detail"), &values));
        assert!(!schema.is_visible(&path("a.sub_detail"), &values));
        assert_eq!(schema.effective_value(&path("a.detail"), &values), None);

        values.insert(path("a.mode"), Value::Choice("Collectif".into()));
        assert!(schema.is_visible(&path("a.detail"), &values));
        assert!(schema.is_visible(&path("a.sub_detail"), &values));
    }

    #[test]
    fn item_fields_follow_group_visibility() {
        let schema = Schema::from_yaml_str(SMALL).unwrap();
        let mut values: HashMap<FieldPath, Value> = HashMap::new();
        assert!(schema.is_visible(&path("a.people[0].name"), &values));
        values.insert(path("a.mode"), Value::Choice("Individuel".into()));
        assert!(!schema.is_visible(&path("a.people"), &values));
        assert!(!schema.is_visible(&path("a.people[0].name"), &values));

        let group = schema.item_schema(&path("a.people")).unwrap();
        let names: Vec<_> = schema.item_fields(group).map(FieldSpec::key).collect();
        assert_eq!(names, vec!["a.people[].name"]);
    }

    #[test]
    fn resolve_rejects_undeclared() {
        let schema = Schema::from_yaml_str(SMALL).unwrap();
        assert!(matches!(
            schema.resolve(&path("a.nope")),
            Err(SchemaError::Undeclared(_))
        ));
        assert!(matches!(
            schema.item_schema(&path("a.mode")),
            Err(SchemaError::NotAGroup(_))
        ));
        assert!(!schema.is_visible(&path("a.nope"), &HashMap::new()));
    }

    fn load_err(yaml: &str) -> SchemaError {
        Schema::from_yaml_str(yaml).unwrap_err()
    }

    fn one_section(fields: &str) -> String {
        format!("name: t\nsections:\n  - key: s\n    label: S\n    fields:\n{fields}")
    }

    #[test]
    fn rejects_predicate_cycle() {
        let yaml = one_section(
            r"      - key: x
        label: X
        type: boolean
        visible_when: { truthy: s.y }
      - key: y
        label: Y
        type: boolean
        visible_when: { truthy: s.x }
",
        );
        assert!(matches!(load_err(&yaml), SchemaError::PredicateCycle(_)));
    }

    #[test]
    fn rejects_self_reference() {
        let yaml = one_section(
            r"      - key: x
        label: X
        type: boolean
        visible_when: { truthy: s.x }
",
        );
        assert!(matches!(load_err(&yaml), SchemaError::PredicateCycle(_)));
    }

    #[test]
    fn rejects_dangling_reference() {
        let yaml = one_section(
            r"      - key: x
        label: X
        type: boolean
        visible_when: { truthy: s.missing }
",
        );
        assert!(matches!(
            load_err(&yaml),
            SchemaError::DanglingReference { .. }
        ));
    }

    #[test]
    fn rejects_list_reference() {
        let yaml = one_section(
            r"      - key: l
        label: L
        type: list
        fields:
          - key: n
            label: N
            type: text
      - key: x
        label: X
        type: boolean
        visible_when: { truthy: s.l }
",
        );
        assert!(matches!(load_err(&yaml), SchemaError::ListReference { .. }));
    }

    #[test]
    fn rejects_bad_literal() {
        let yaml = one_section(
            r"      - key: flag
        label: F
        type: boolean
      - key: x
        label: X
        type: text
        visible_when: { equals: { path: s.flag, value: maybe } }
",
        );
        assert!(matches!(load_err(&yaml), SchemaError::InvalidLiteral { .. }));
    }

    #[test]
    fn rejects_duplicates_and_nested_lists() {
        let dup = one_section(
            r"      - key: x
        label: X
        type: text
      - key: x
        label: X
        type: text
",
        );
        assert!(matches!(load_err(&dup), SchemaError::Duplicate(_)));

        let nested = one_section(
            r"      - key: l
        label: L
        type: list
        fields:
          - key: inner
            label: I
            type: list
",
        );
        assert!(matches!(load_err(&nested), SchemaError::NestedList(_)));
    }

    #[test]
    fn rejects_bad_constraints() {
        let bounds = one_section(
            r"      - key: x
        label: X
        type: decimal
        min: 10
        max: 1
",
        );
        assert!(matches!(
            load_err(&bounds),
            SchemaError::InvalidDeclaration { .. }
        ));

        let regex = one_section(
            r#"      - key: x
        label: X
        type: text
        pattern: "(["
"#,
        );
        assert!(matches!(
            load_err(&regex),
            SchemaError::InvalidDeclaration { .. }
        ));

        let two_keys = one_section(
            r"      - key: f
        label: F
        type: boolean
      - key: x
        label: X
        type: text
        visible_when: { truthy: s.f, not: { truthy: s.f } }
",
        );
        assert!(matches!(
            load_err(&two_keys),
            SchemaError::InvalidDeclaration { .. }
        ));

        let unbounded = one_section(&format!(
            "      - key: l\n        label: L\n        type: list\n        min_items: {}\n        fields:\n          - key: n\n            label: N\n            type: text\n",
            DEFAULT_MAX_ITEMS + 1
        ));
        assert!(matches!(
            load_err(&unbounded),
            SchemaError::InvalidDeclaration { .. }
        ));
    }

    #[test]
    fn fingerprint_tracks_source() {
        let a = Schema::from_yaml_str(SMALL).unwrap();
        let b = Schema::from_yaml_str(SMALL).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        let c = Schema::from_yaml_str(&format!("{SMALL}\n# changed\n")).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
