//! Persisted layout of a document state
//!
//! One flat record per session: canonical path → node, plus item counts so
//! that appended but still empty items survive a reload.

use crate::error::{RecordProblem, RestoreError};
use crate::node::ValueNode;
use crate::state::{DocumentState, Item};
use bail_schema::{FieldPath, ListRule, Schema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serializable snapshot of a [`DocumentState`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// State version at snapshot time
    pub version: u64,
    /// Canonical path → node
    #[serde(default)]
    pub fields: BTreeMap<String, ValueNode>,
    /// Group path → item count
    #[serde(default)]
    pub lists: BTreeMap<String, usize>,
}

impl DocumentState {
    /// Snapshot for storage
    #[must_use]
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            version: self.version,
            fields: self
                .nodes()
                .map(|(path, node)| (path.to_string(), node.clone()))
                .collect(),
            lists: self
                .groups()
                .map(|(group, count)| (group.to_string(), count))
                .collect(),
        }
    }

    /// Rebuild state from a snapshot, re-validating every record
    ///
    /// # Errors
    /// Returns every record that does not agree with the schema
    pub fn restore(schema: &Schema, persisted: &PersistedState) -> Result<Self, RestoreError> {
        let mut problems = Vec::new();
        let mut state = Self {
            version: persisted.version,
            ..Self::default()
        };

        for (raw, &count) in &persisted.lists {
            let mut problem = |reason: String| {
                problems.push(RecordProblem {
                    path: raw.clone(),
                    reason,
                });
            };
            let group = match raw.parse::<FieldPath>() {
                Ok(group) => group,
                Err(e) => {
                    problem(e.to_string());
                    continue;
                }
            };
            match schema.item_schema(&group) {
                Ok(spec) => {
                    if let Some(max) = spec.list_rule().map(ListRule::item_limit) {
                        if count > max {
                            problem(format!("{count} items exceed the maximum {max}"));
                            continue;
                        }
                    }
                    state.groups.insert(group, vec![Item::new(); count]);
                }
                Err(e) => problem(e.to_string()),
            }
        }

        for (raw, node) in &persisted.fields {
            if let Err(reason) = state.restore_node(schema, raw, node, persisted.version) {
                problems.push(RecordProblem {
                    path: raw.clone(),
                    reason,
                });
            }
        }

        if problems.is_empty() {
            Ok(state)
        } else {
            Err(RestoreError { problems })
        }
    }

    fn restore_node(
        &mut self,
        schema: &Schema,
        raw: &str,
        node: &ValueNode,
        version: u64,
    ) -> Result<(), String> {
        let path: FieldPath = raw.parse().map_err(|e: bail_schema::PathError| e.to_string())?;
        let spec = schema.resolve(&path).map_err(|e| e.to_string())?;
        if spec.is_list() {
            return Err("list groups hold no value".into());
        }
        if !node.is_consistent() {
            return Err("provenance does not match value".into());
        }
        if node.last_modified_version() > version {
            return Err(format!(
                "written at version {} after snapshot version {version}",
                node.last_modified_version()
            ));
        }
        if let Some(value) = node.value() {
            spec.kind().check(value).map_err(|e| e.to_string())?;
        }

        match path.split_item() {
            None => {
                self.scalars.insert(path, node.clone());
            }
            Some((group, index, field)) => {
                let item = self
                    .groups
                    .get_mut(&group)
                    .and_then(|items| items.get_mut(index))
                    .ok_or_else(|| format!("item {index} of {group} was not persisted"))?;
                item.insert(field, node.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bail_schema::Value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::furnished_lease().unwrap()
    }

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    fn sample(schema: &Schema) -> DocumentState {
        let mut state = DocumentState::new();
        let tenants = path("designation_parties.locataires");
        state.append_list_item(schema, &tenants).unwrap();
        state.append_list_item(schema, &tenants).unwrap();
        state
            .set(
                schema,
                &path("designation_parties.locataires[0].nom_prenom"),
                &json!("Jean Dupont"),
            )
            .unwrap();
        state
            .set(schema, &path("duree_contrat.date_prise_effet"), &json!("2025-09-01"))
            .unwrap();
        state.set(schema, &path("signature.ville"), &json!("Lyon")).unwrap();
        state.clear(schema, &path("signature.ville")).unwrap();
        state
    }

    #[test]
    fn snapshot_restores_identically() {
        let schema = schema();
        let state = sample(&schema);
        let persisted = state.to_persisted();

        assert_eq!(persisted.version, 6);
        assert_eq!(persisted.lists["designation_parties.locataires"], 2);
        assert!(persisted
            .fields
            .contains_key("designation_parties.locataires[0].nom_prenom"));

        let json = serde_json::to_string(&persisted).unwrap();
        let back: PersistedState = serde_json::from_str(&json).unwrap();
        let restored = DocumentState::restore(&schema, &back).unwrap();
        assert_eq!(restored, state);
        assert_eq!(restored.item_count(&path("designation_parties.locataires")), 2);
    }

    #[test]
    fn restore_reports_every_bad_record() {
        let schema = schema();
        let mut persisted = sample(&schema).to_persisted();
        persisted.fields.insert(
            "colocation.est_colocation".into(),
            ValueNode::user(Value::Text("oui".into()), 1),
        );
        persisted
            .fields
            .insert("garanties.inconnu".into(), ValueNode::user(Value::Boolean(true), 1));
        persisted.fields.insert(
            "designation_parties.garants[0].noms".into(),
            ValueNode::user(Value::Text("X".into()), 1),
        );

        let err = DocumentState::restore(&schema, &persisted).unwrap_err();
        let mut paths: Vec<_> = err.problems.iter().map(|p| p.path.as_str()).collect();
        paths.sort_unstable();
        assert_eq!(
            paths,
            vec![
                "colocation.est_colocation",
                "designation_parties.garants[0].noms",
                "garanties.inconnu",
            ]
        );
    }

    #[test]
    fn restore_rejects_future_versions() {
        let schema = schema();
        let mut persisted = PersistedState::default();
        persisted.fields.insert(
            "signature.ville".into(),
            ValueNode::user(Value::Text("Lyon".into()), 9),
        );
        assert!(DocumentState::restore(&schema, &persisted).is_err());
    }

    #[test]
    fn restore_caps_unbounded_groups() {
        let schema = Schema::from_yaml_str(
            r"
name: notes
sections:
  - key: s
    label: S
    fields:
      - key: notes
        label: Notes
        type: list
        fields:
          - key: texte
            label: Texte
            type: text
",
        )
        .unwrap();
        let group = path("s.notes");

        let mut persisted = PersistedState {
            version: 1,
            ..PersistedState::default()
        };
        persisted.lists.insert("s.notes".into(), usize::MAX);
        let err = DocumentState::restore(&schema, &persisted).unwrap_err();
        assert_eq!(err.problems.len(), 1);
        assert_eq!(err.problems[0].path, "s.notes");

        let mut state = DocumentState::new();
        for _ in 0..bail_schema::DEFAULT_MAX_ITEMS {
            state.append_list_item(&schema, &group).unwrap();
        }
        assert!(state.append_list_item(&schema, &group).is_err());
        let restored = DocumentState::restore(&schema, &state.to_persisted()).unwrap();
        assert_eq!(restored.item_count(&group), bail_schema::DEFAULT_MAX_ITEMS);
    }
}
