//! Completeness and progress reporting
//!
//! Completeness is derived from the schema alone: a slot is every visible
//! required leaf, every visible group with a minimum item count, and every
//! visible required field of an existing item.

use bail_schema::{FieldPath, Schema, SectionSpec, Value};
use bail_state::DocumentState;
use serde::{Deserialize, Serialize};

/// Progress of one top-level section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionProgress {
    pub key: String,
    pub label: String,
    /// Required slots holding a value
    pub filled: usize,
    /// Visible required slots
    pub required: usize,
    /// `filled * 100 / required`, `None` when nothing is required
    pub percent: Option<u8>,
    /// Required slots still empty, in declaration order
    pub missing: Vec<FieldPath>,
}

/// Progress of the whole document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub sections: Vec<SectionProgress>,
    pub filled: usize,
    pub required: usize,
    pub percent: Option<u8>,
    pub complete: bool,
}

impl ProgressReport {
    /// Every missing path across sections, in declaration order
    #[must_use]
    pub fn missing(&self) -> Vec<FieldPath> {
        self.sections
            .iter()
            .flat_map(|s| s.missing.iter().cloned())
            .collect()
    }
}

/// Current state of one field, for inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDetail {
    pub path: FieldPath,
    pub label: String,
    pub kind: String,
    pub required: bool,
    pub visible: bool,
    pub value: Option<Value>,
    /// Item count, for list groups only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,
}

/// Every field of one section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDetails {
    pub key: String,
    pub label: String,
    pub fields: Vec<FieldDetail>,
}

fn percent(filled: usize, required: usize) -> Option<u8> {
    if required == 0 {
        return None;
    }
    u8::try_from(filled * 100 / required).ok()
}

fn required_slots(
    state: &DocumentState,
    schema: &Schema,
    section: &SectionSpec,
) -> Vec<(FieldPath, bool)> {
    let mut slots = Vec::new();
    for spec in schema.section_fields(section) {
        if !schema.spec_visible(spec, state) {
            continue;
        }
        let path = spec.path();
        match spec.list_rule() {
            Some(rule) => {
                let count = state.item_count(path);
                if rule.min_items > 0 {
                    slots.push((path.clone(), count >= rule.min_items));
                }
                for index in 0..count {
                    for item in schema.item_fields(spec) {
                        if !item.is_required() || !schema.spec_visible(item, state) {
                            continue;
                        }
                        let concrete = path.item(index).join(item.path());
                        let filled = state.get(&concrete).is_some();
                        slots.push((concrete, filled));
                    }
                }
            }
            None if spec.is_required() => slots.push((path.clone(), state.get(path).is_some())),
            None => {}
        }
    }
    slots
}

/// Progress of one section
#[must_use]
pub fn section_progress(
    state: &DocumentState,
    schema: &Schema,
    section: &SectionSpec,
) -> SectionProgress {
    let slots = required_slots(state, schema, section);
    let required = slots.len();
    let filled = slots.iter().filter(|(_, f)| *f).count();
    SectionProgress {
        key: section.key().to_string(),
        label: section.label().to_string(),
        filled,
        required,
        percent: percent(filled, required),
        missing: slots
            .into_iter()
            .filter_map(|(p, f)| (!f).then_some(p))
            .collect(),
    }
}

/// Progress of every section plus overall figures
#[must_use]
pub fn progress(state: &DocumentState, schema: &Schema) -> ProgressReport {
    let sections: Vec<_> = schema
        .sections()
        .iter()
        .map(|s| section_progress(state, schema, s))
        .collect();
    let filled = sections.iter().map(|s| s.filled).sum();
    let required = sections.iter().map(|s| s.required).sum();
    ProgressReport {
        complete: filled == required,
        percent: percent(filled, required),
        filled,
        required,
        sections,
    }
}

/// Required-but-unresolved paths, considering current visibility
#[must_use]
pub fn unresolved(state: &DocumentState, schema: &Schema) -> Vec<FieldPath> {
    schema
        .sections()
        .iter()
        .flat_map(|s| required_slots(state, schema, s))
        .filter_map(|(p, f)| (!f).then_some(p))
        .collect()
}

/// Every field of a section with its current value and flags
///
/// Returns `None` for an unknown section.
#[must_use]
pub fn section_details(
    state: &DocumentState,
    schema: &Schema,
    section: &str,
) -> Option<SectionDetails> {
    let section = schema.section(section)?;
    let mut fields = Vec::new();
    for spec in schema.section_fields(section) {
        let path = spec.path();
        let visible = schema.spec_visible(spec, state);
        if spec.is_list() {
            let count = state.item_count(path);
            fields.push(FieldDetail {
                path: path.clone(),
                label: spec.label().to_string(),
                kind: spec.kind().type_name().to_string(),
                required: spec.is_required(),
                visible,
                value: None,
                items: Some(count),
            });
            for index in 0..count {
                for item in schema.item_fields(spec) {
                    let concrete = path.item(index).join(item.path());
                    fields.push(FieldDetail {
                        label: item.label().to_string(),
                        kind: item.kind().type_name().to_string(),
                        required: item.is_required(),
                        visible: schema.spec_visible(item, state),
                        value: state.get(&concrete).cloned(),
                        items: None,
                        path: concrete,
                    });
                }
            }
        } else {
            fields.push(FieldDetail {
                path: path.clone(),
                label: spec.label().to_string(),
                kind: spec.kind().type_name().to_string(),
                required: spec.is_required(),
                visible,
                value: state.get(path).cloned(),
                items: None,
            });
        }
    }
    Some(SectionDetails {
        key: section.key().to_string(),
        label: section.label().to_string(),
        fields,
    })
}
