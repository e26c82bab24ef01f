//! Per-session document state
//!
//! [`DocumentState`] holds every value written for one contract. Scalars
//! are keyed by their full path; repeatable groups are dense arrays of
//! items keyed by item-relative path.

use crate::error::{MutationError, ValidationError};
use crate::node::ValueNode;
use bail_schema::{
    ConstraintViolation, FieldPath, FieldSpec, ListRule, Schema, Value, ValueSource,
};
use std::collections::BTreeMap;

pub(crate) type Item = BTreeMap<FieldPath, ValueNode>;

/// Live values of one contract being filled
///
/// # Invariants
/// - every stored value was accepted by its field's declaration
/// - item indices are dense (`0..len`)
/// - `version` counts successful mutations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentState {
    pub(crate) version: u64,
    pub(crate) scalars: BTreeMap<FieldPath, ValueNode>,
    pub(crate) groups: BTreeMap<FieldPath, Vec<Item>>,
}

impl DocumentState {
    /// Empty state at version 0
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful mutations so far
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Stored node at a concrete path (tombstones included)
    #[must_use]
    pub fn node(&self, path: &FieldPath) -> Option<&ValueNode> {
        match path.split_item() {
            None => self.scalars.get(path),
            Some((group, index, field)) => self.groups.get(&group)?.get(index)?.get(&field),
        }
    }

    /// Current value at a concrete path, `None` when unset
    #[inline]
    #[must_use]
    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        self.node(path)?.value()
    }

    /// Number of items in a group
    #[must_use]
    pub fn item_count(&self, group: &FieldPath) -> usize {
        self.groups.get(group).map_or(0, Vec::len)
    }

    /// Every stored node with its concrete path, scalars first
    pub fn nodes(&self) -> impl Iterator<Item = (FieldPath, &ValueNode)> + '_ {
        let scalars = self.scalars.iter().map(|(p, n)| (p.clone(), n));
        let items = self.groups.iter().flat_map(|(group, items)| {
            items.iter().enumerate().flat_map(move |(index, item)| {
                item.iter()
                    .map(move |(field, node)| (group.item(index).join(field), node))
            })
        });
        scalars.chain(items)
    }

    /// Group paths with their item counts
    pub fn groups(&self) -> impl Iterator<Item = (&FieldPath, usize)> {
        self.groups.iter().map(|(g, items)| (g, items.len()))
    }

    /// Coerce and store an agent-supplied value
    ///
    /// Returns the stored typed value.
    ///
    /// # Errors
    /// - [`MutationError::Schema`] if the path is undeclared
    /// - [`MutationError::NotFound`] if the list item does not exist
    /// - [`MutationError::Validation`] if the value is rejected
    pub fn set(
        &mut self,
        schema: &Schema,
        path: &FieldPath,
        raw: &serde_json::Value,
    ) -> Result<Value, MutationError> {
        let spec = self.leaf(schema, path)?;
        let value = spec
            .kind()
            .coerce(raw)
            .map_err(|violation| invalid(path, violation))?;
        let version = self.bump();
        self.write(path, ValueNode::user(value.clone(), version));
        Ok(value)
    }

    /// Store an already-typed value after checking it
    ///
    /// # Errors
    /// Same as [`DocumentState::set`]
    pub fn set_value(
        &mut self,
        schema: &Schema,
        path: &FieldPath,
        value: Value,
    ) -> Result<(), MutationError> {
        let spec = self.leaf(schema, path)?;
        spec.kind()
            .check(&value)
            .map_err(|violation| invalid(path, violation))?;
        let version = self.bump();
        self.write(path, ValueNode::user(value, version));
        Ok(())
    }

    /// Return a field to unset
    ///
    /// Leaves a tombstone recording the clear version.
    ///
    /// # Errors
    /// - [`MutationError::Schema`] if the path is undeclared
    /// - [`MutationError::NotFound`] if the list item does not exist
    pub fn clear(&mut self, schema: &Schema, path: &FieldPath) -> Result<(), MutationError> {
        self.leaf(schema, path)?;
        let version = self.bump();
        self.write(path, ValueNode::cleared(version));
        Ok(())
    }

    /// Append an empty item to a group, returning its index
    ///
    /// # Errors
    /// - [`MutationError::Schema`] if `group` is not a declared list group
    /// - [`MutationError::Validation`] if the group is full
    pub fn append_list_item(
        &mut self,
        schema: &Schema,
        group: &FieldPath,
    ) -> Result<usize, MutationError> {
        let spec = schema.item_schema(group)?;
        let len = self.item_count(group);
        if let Some(max) = spec.list_rule().map(ListRule::item_limit) {
            if len >= max {
                return Err(invalid(group, ConstraintViolation::GroupFull { max }).into());
            }
        }
        self.bump();
        self.groups.entry(group.clone()).or_default().push(Item::new());
        Ok(len)
    }

    /// Remove an item and renumber the ones after it
    ///
    /// # Errors
    /// - [`MutationError::Schema`] if `group` is not a declared list group
    /// - [`MutationError::NotFound`] if `index` is out of range
    pub fn remove_list_item(
        &mut self,
        schema: &Schema,
        group: &FieldPath,
        index: usize,
    ) -> Result<(), MutationError> {
        schema.item_schema(group)?;
        let Some(items) = self
            .groups
            .get_mut(group)
            .filter(|items| index < items.len())
        else {
            return Err(MutationError::NotFound {
                path: group.item(index).to_string(),
            });
        };
        items.remove(index);
        self.bump();
        Ok(())
    }

    fn leaf<'s>(
        &self,
        schema: &'s Schema,
        path: &FieldPath,
    ) -> Result<&'s FieldSpec, MutationError> {
        let spec = schema.resolve(path)?;
        if spec.is_list() {
            return Err(invalid(path, ConstraintViolation::GroupNotAssignable).into());
        }
        if let Some((group, index, _)) = path.split_item() {
            if index >= self.item_count(&group) {
                return Err(MutationError::NotFound {
                    path: path.to_string(),
                });
            }
        }
        Ok(spec)
    }

    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn write(&mut self, path: &FieldPath, node: ValueNode) {
        match path.split_item() {
            None => {
                self.scalars.insert(path.clone(), node);
            }
            Some((group, index, field)) => {
                if let Some(item) = self
                    .groups
                    .get_mut(&group)
                    .and_then(|items| items.get_mut(index))
                {
                    item.insert(field, node);
                }
            }
        }
    }
}

fn invalid(path: &FieldPath, violation: ConstraintViolation) -> ValidationError {
    ValidationError {
        path: path.to_string(),
        violation,
    }
}

impl ValueSource for DocumentState {
    fn value_at(&self, path: &FieldPath) -> Option<&Value> {
        self.get(path)
    }
}
